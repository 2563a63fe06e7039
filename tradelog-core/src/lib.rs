//! Tradelog Core — journal/backtest engine for intraday equity trades.
//!
//! This crate contains the algorithmic heart of the journal:
//! - Domain types (bars, fills, logical trades)
//! - Volatility measure (True Range SMA over a configurable lookback)
//! - Stop/target planning (one stop, a five-level target ladder)
//! - Bar-walk outcome simulation with the stop-wins tie-break
//! - Fill classification and two trade reconstruction policies
//! - Outcome consolidation across volatility windows
//!
//! Everything here is synchronous, single-threaded, and pure: identical
//! inputs produce byte-identical outputs. All I/O (bar fetch, fill
//! parsing, persistence) lives in collaborator crates.

pub mod aggregate;
pub mod classify;
pub mod domain;
pub mod plan;
pub mod reconstruct;
pub mod volatility;
pub mod walk;
