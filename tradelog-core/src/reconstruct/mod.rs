//! Trade reconstruction: raw fills to logical trades.
//!
//! Two selectable policies over the same fill classification:
//! - FIFO: every entry-side fill spawns a new trade; exits consume the
//!   oldest open trade first.
//! - Position: all fills for a symbol/session collapse into one trade
//!   with a typed event log.
//!
//! Reconciliation anomalies (orphan exits, positions still open at
//! session end, oversized exits) are returned as warning strings, never
//! as errors — processing always continues.

pub mod fifo;
pub mod position;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Fill, TradeSummary};

pub use fifo::reconstruct_fifo;
pub use position::reconstruct_position;

/// Which reconstruction algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructPolicy {
    Fifo,
    Position,
}

/// Reconstruct one symbol's session under the chosen policy.
///
/// Fills must be chronological for the symbol. Both policies emit the same
/// `TradeSummary` contract, so callers are policy-agnostic.
pub fn reconstruct(
    policy: ReconstructPolicy,
    symbol: &str,
    date: NaiveDate,
    fills: &[Fill],
) -> (Vec<TradeSummary>, Vec<String>) {
    match policy {
        ReconstructPolicy::Fifo => {
            let (trades, warnings) = reconstruct_fifo(symbol, date, fills);
            (trades.iter().map(|t| t.to_summary()).collect(), warnings)
        }
        ReconstructPolicy::Position => {
            let (trade, warnings) = reconstruct_position(symbol, date, fills);
            (trade.iter().map(|t| t.to_summary()).collect(), warnings)
        }
    }
}
