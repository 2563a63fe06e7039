//! Stop/target planning: one stop and a ladder of five profit targets.
//!
//! The stop distance is the volatility measure used raw, 1x with no
//! multiplier. Target level n sits n stop distances beyond the entry.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Number of profit target levels in the ladder.
pub const TARGET_COUNT: usize = 5;

/// Entry, stop, and target prices for one trade at one volatility measure.
///
/// Invariants: for LONG, `targets` is strictly increasing above entry and
/// the stop sits below; for SHORT the mirror image. `targets[n-1]` is the
/// level-n price: entry +/- n x distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopPlan {
    pub entry_price: f64,
    pub direction: Direction,
    pub stop_distance: f64,
    pub stop_price: f64,
    pub targets: [f64; TARGET_COUNT],
}

impl StopPlan {
    /// Build a plan from an entry price and a volatility measure.
    ///
    /// Returns `None` when the entry price or the measure is non-positive
    /// or NaN — an expected skip condition near session boundaries, not an
    /// error.
    pub fn build(entry_price: f64, direction: Direction, measure: f64) -> Option<StopPlan> {
        if entry_price.is_nan() || entry_price <= 0.0 || measure.is_nan() || measure <= 0.0 {
            return None;
        }

        let mut targets = [0.0; TARGET_COUNT];
        let stop_price = match direction {
            Direction::Long => {
                for (i, t) in targets.iter_mut().enumerate() {
                    *t = entry_price + (i + 1) as f64 * measure;
                }
                entry_price - measure
            }
            Direction::Short => {
                for (i, t) in targets.iter_mut().enumerate() {
                    *t = entry_price - (i + 1) as f64 * measure;
                }
                entry_price + measure
            }
        };

        Some(StopPlan {
            entry_price,
            direction,
            stop_distance: measure,
            stop_price,
            targets,
        })
    }

    /// Price of target level `n` (1-based).
    pub fn target(&self, level: usize) -> f64 {
        self.targets[level - 1]
    }
}

/// P&L of an actual exit expressed in R-multiples of the stop distance.
pub fn pnl_r(direction: Direction, entry_price: f64, exit_price: f64, stop_distance: f64) -> Option<f64> {
    if stop_distance.is_nan() || stop_distance <= 0.0 {
        return None;
    }
    let per_share = match direction {
        Direction::Long => exit_price - entry_price,
        Direction::Short => entry_price - exit_price,
    };
    Some(per_share / stop_distance)
}
