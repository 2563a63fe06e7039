//! Outcome consolidation: merge per-window simulation records into one row.
//!
//! A pure merge/derive step with no new simulation. The wider volatility
//! window is authoritative for the final win/loss label and exit reason;
//! the tighter window rides along for analysis.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::TradeSummary;
use crate::plan::pnl_r;
use crate::walk::{ExitReason, Outcome, OutcomeRecord};

/// Consolidated per-trade outcome across both volatility windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedOutcome {
    pub trade_id: String,
    pub symbol: String,
    pub date: chrono::NaiveDate,
    pub direction: crate::domain::Direction,
    pub entry_price: f64,
    pub entry_time: NaiveTime,

    /// Record at the tighter volatility window, if the measure existed.
    pub tight: Option<OutcomeRecord>,
    /// Record at the wider, authoritative window, if the measure existed.
    pub wide: Option<OutcomeRecord>,

    /// Minutes from entry to the wide window's level-1 touch.
    pub minutes_to_level1: Option<i64>,
    pub reached_level2: bool,
    pub reached_level3: bool,

    /// Authoritative pair, from the wide window.
    pub exit_reason: Option<ExitReason>,
    pub outcome: Option<Outcome>,
    pub is_winner: bool,

    /// P&L of the actual exit in R-multiples of the wide stop distance.
    pub pnl_r: Option<f64>,
    /// Last window close, for end-of-day reference.
    pub eod_price: Option<f64>,
}

/// Merge a trade's per-window records into one consolidated row.
pub fn consolidate(
    trade: &TradeSummary,
    trade_seq: u32,
    tight: Option<OutcomeRecord>,
    wide: Option<OutcomeRecord>,
    eod_price: Option<f64>,
) -> ConsolidatedOutcome {
    let minutes_to_level1 = wide
        .as_ref()
        .and_then(|r| r.level(1).time)
        .map(|t| minutes_between(trade.entry_time, t));

    let reached_level2 = wide.as_ref().is_some_and(|r| r.level(2).hit);
    let reached_level3 = wide.as_ref().is_some_and(|r| r.level(3).hit);

    let exit_reason = wide.as_ref().map(|r| r.exit_reason);
    let outcome = wide.as_ref().map(|r| r.outcome);
    let is_winner = outcome == Some(Outcome::Win);

    let trade_pnl_r = match (&wide, trade.exit_price) {
        (Some(record), Some(exit_price)) => pnl_r(
            trade.direction,
            trade.entry_price,
            exit_price,
            record.stop_distance,
        ),
        _ => None,
    };

    ConsolidatedOutcome {
        trade_id: trade.trade_id(trade_seq),
        symbol: trade.symbol.clone(),
        date: trade.date,
        direction: trade.direction,
        entry_price: trade.entry_price,
        entry_time: trade.entry_time,
        tight,
        wide,
        minutes_to_level1,
        reached_level2,
        reached_level3,
        exit_reason,
        outcome,
        is_winner,
        pnl_r: trade_pnl_r,
        eod_price,
    }
}

/// Whole minutes from `from` to `to`, floored at zero.
fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_minutes().max(0)
}
