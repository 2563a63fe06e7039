//! Bar-walk outcome simulation.
//!
//! Replays minute bars inside the trade window and decides which level is
//! reached first. Two asymmetric hit rules:
//! - Stop is close-based: only a bar *close* beyond the stop triggers it.
//! - Targets are wick-based: a high (LONG) or low (SHORT) touch counts.
//!
//! Same-bar conflicts resolve stop-first: a bar whose close breaches the
//! stop credits no targets, even if its wick also touched one.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction};
use crate::plan::{StopPlan, TARGET_COUNT};

/// Why the simulation window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// The stop condition fired.
    StopHit,
    /// The full target ladder was reached.
    R5Hit,
    /// Bars ran out before a stop or the full ladder.
    Eod,
}

/// Terminal win/loss classification.
///
/// WIN means target level 1 was hit before any stop — a stop firing on a
/// later bar does not revoke it, since level 1 already locked in the
/// profit-taking opportunity. Everything else, including plain window
/// exhaustion, is LOSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
}

/// Hit state for one target level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelHit {
    pub hit: bool,
    pub time: Option<NaiveTime>,
}

/// Complete result of one bar walk at one volatility measure.
///
/// Produced once per simulation and never mutated afterward; a new
/// simulation produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub atr_value: f64,
    pub stop_price: f64,
    pub stop_distance: f64,
    pub target_prices: [f64; TARGET_COUNT],
    pub levels: [LevelHit; TARGET_COUNT],
    pub stop_hit: bool,
    pub stop_time: Option<NaiveTime>,
    /// Highest target level reached, 0 if none.
    pub max_level: u8,
    pub outcome: Outcome,
    pub exit_reason: ExitReason,
}

impl OutcomeRecord {
    /// Hit state for target level `n` (1-based).
    pub fn level(&self, n: usize) -> LevelHit {
        self.levels[n - 1]
    }
}

/// Slice the bars that belong to a trade's simulation window.
///
/// Half-open `[entry, end)`: `end` is the explicit exit timestamp when the
/// trade's exit is known, otherwise the EOD cutoff on the entry date. Bars
/// must already be sorted by timestamp.
pub fn session_window(
    bars: &[Bar],
    entry: NaiveDateTime,
    exit: Option<NaiveDateTime>,
    eod_cutoff: NaiveTime,
) -> &[Bar] {
    let end = exit.unwrap_or_else(|| entry.date().and_time(eod_cutoff));
    let start_idx = bars.partition_point(|b| b.timestamp < entry);
    let end_idx = bars.partition_point(|b| b.timestamp < end);
    &bars[start_idx..end_idx.max(start_idx)]
}

/// Walk the window bar by bar and emit the hit/outcome record.
///
/// Per-bar order is strict: the close-based stop check runs first, and a
/// triggered stop ends the walk without crediting targets on that bar. If
/// the stop did not fire, every not-yet-hit level is tested against the
/// bar's wick; one bar may mark several levels at the same timestamp.
pub fn walk(plan: &StopPlan, window: &[Bar]) -> OutcomeRecord {
    let mut levels = [LevelHit::default(); TARGET_COUNT];
    let mut stop_hit = false;
    let mut stop_time = None;

    for bar in window {
        let stop_on_this_bar = match plan.direction {
            Direction::Long => bar.close <= plan.stop_price,
            Direction::Short => bar.close >= plan.stop_price,
        };

        if stop_on_this_bar {
            stop_hit = true;
            stop_time = Some(bar.time());
            break;
        }

        for (i, level) in levels.iter_mut().enumerate() {
            if level.hit {
                continue;
            }
            let touched = match plan.direction {
                Direction::Long => bar.high >= plan.targets[i],
                Direction::Short => bar.low <= plan.targets[i],
            };
            if touched {
                level.hit = true;
                level.time = Some(bar.time());
            }
        }
    }

    let max_level = max_level(&levels);

    let outcome = if levels[0].hit {
        Outcome::Win
    } else {
        Outcome::Loss
    };

    let exit_reason = if stop_hit {
        ExitReason::StopHit
    } else if max_level as usize == TARGET_COUNT {
        ExitReason::R5Hit
    } else {
        ExitReason::Eod
    };

    OutcomeRecord {
        atr_value: plan.stop_distance,
        stop_price: plan.stop_price,
        stop_distance: plan.stop_distance,
        target_prices: plan.targets,
        levels,
        stop_hit,
        stop_time,
        max_level,
        outcome,
        exit_reason,
    }
}

/// Highest hit level, scanning 5 down to 1.
fn max_level(levels: &[LevelHit; TARGET_COUNT]) -> u8 {
    for n in (1..=TARGET_COUNT).rev() {
        if levels[n - 1].hit {
            return n as u8;
        }
    }
    0
}
