//! Batch pipeline: fills and bars in, consolidated outcomes out.
//!
//! Per symbol: reconstruct trades under the configured policy, then per
//! trade: volatility measure at entry (both windows), stop/target plan,
//! bar walk, consolidation. Symbols are independent units of work, so the
//! batch fans out across a Rayon pool with no shared mutable state.
//!
//! The batch contract is best effort: insufficient data skips the trade,
//! reconciliation anomalies become warnings, and a panicking trade is
//! caught and recorded as an error entry — the run always completes and
//! reports {processed, skipped, warnings, errors}.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use tradelog_core::aggregate::{consolidate, ConsolidatedOutcome};
use tradelog_core::domain::{Bar, Fill, TradeSummary};
use tradelog_core::plan::StopPlan;
use tradelog_core::reconstruct::reconstruct;
use tradelog_core::volatility::atr_at_time;
use tradelog_core::walk::{session_window, walk, OutcomeRecord};

use crate::config::RunnerConfig;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One session's worth of input: chronological fills plus the minute bars
/// for every symbol they touch.
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub date: NaiveDate,
    pub fills: Vec<Fill>,
    pub bars_by_symbol: BTreeMap<String, Vec<Bar>>,
}

/// An unexpected failure while processing one trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeError {
    pub trade_id: String,
    pub message: String,
}

/// Counts reported at the end of every batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub processed: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Complete result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub date: NaiveDate,
    /// Every reconstructed trade, including skipped ones.
    pub trades: Vec<TradeSummary>,
    /// One consolidated row per simulated trade.
    pub outcomes: Vec<ConsolidatedOutcome>,
    /// Non-fatal reconciliation and data-quality warnings.
    pub warnings: Vec<String>,
    /// Trades that failed unexpectedly, keyed by trade identity.
    pub errors: Vec<TradeError>,
    pub stats: BatchStats,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Progress callbacks for long batch runs.
pub trait BatchProgress: Sync {
    /// Called when a symbol's trades start processing.
    fn on_symbol(&self, symbol: &str, index: usize, total: usize);

    /// Called after each trade resolves (processed or skipped).
    fn on_trade(&self, trade_id: &str, detail: &str);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, stats: &BatchStats);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl BatchProgress for StdoutProgress {
    fn on_symbol(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] {symbol}...", index + 1, total);
    }

    fn on_trade(&self, trade_id: &str, detail: &str) {
        println!("  {trade_id}: {detail}");
    }

    fn on_batch_complete(&self, stats: &BatchStats) {
        println!(
            "Done: {} processed, {} skipped, {} warnings, {} errors",
            stats.processed, stats.skipped, stats.warnings, stats.errors,
        );
    }
}

/// Silent progress reporter for library callers and tests.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn on_symbol(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_trade(&self, _trade_id: &str, _detail: &str) {}
    fn on_batch_complete(&self, _stats: &BatchStats) {}
}

/// Per-symbol accumulator produced inside the parallel fan-out.
struct SymbolOutput {
    trades: Vec<TradeSummary>,
    outcomes: Vec<ConsolidatedOutcome>,
    warnings: Vec<String>,
    errors: Vec<TradeError>,
    skipped: usize,
}

/// Run the full pipeline over one session.
pub fn run_batch(
    config: &RunnerConfig,
    session: &SessionInput,
    progress: &dyn BatchProgress,
) -> BatchResult {
    let fills_by_symbol = partition_fills(&session.fills);
    let symbols: Vec<&String> = fills_by_symbol.keys().collect();
    let total = symbols.len();

    let outputs: Vec<SymbolOutput> = symbols
        .par_iter()
        .enumerate()
        .map(|(index, symbol)| {
            progress.on_symbol(symbol, index, total);
            process_symbol(
                config,
                session,
                symbol,
                &fills_by_symbol[symbol.as_str()],
                progress,
            )
        })
        .collect();

    let mut result = BatchResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        date: session.date,
        trades: Vec::new(),
        outcomes: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
        stats: BatchStats::default(),
    };

    for output in outputs {
        result.stats.processed += output.outcomes.len();
        result.stats.skipped += output.skipped;
        result.stats.errors += output.errors.len();
        result.trades.extend(output.trades);
        result.outcomes.extend(output.outcomes);
        result.warnings.extend(output.warnings);
        result.errors.extend(output.errors);
    }
    result.stats.warnings = result.warnings.len();

    progress.on_batch_complete(&result.stats);
    result
}

/// Group fills per symbol, preserving chronological order within each.
fn partition_fills(fills: &[Fill]) -> BTreeMap<String, Vec<Fill>> {
    let mut groups: BTreeMap<String, Vec<Fill>> = BTreeMap::new();
    for fill in fills {
        groups.entry(fill.symbol.clone()).or_default().push(fill.clone());
    }
    groups
}

fn process_symbol(
    config: &RunnerConfig,
    session: &SessionInput,
    symbol: &str,
    fills: &[Fill],
    progress: &dyn BatchProgress,
) -> SymbolOutput {
    let (trades, mut warnings) = reconstruct(config.policy, symbol, session.date, fills);

    let mut output = SymbolOutput {
        trades: Vec::new(),
        outcomes: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
        skipped: 0,
    };

    let bars = session.bars_by_symbol.get(symbol).map(Vec::as_slice);
    if bars.is_none() {
        warnings.push(format!("{symbol}: no bars for session, skipping simulation"));
    }

    for (i, trade) in trades.iter().enumerate() {
        let seq = (i + 1) as u32;
        let trade_id = trade.trade_id(seq);

        let Some(bars) = bars else {
            output.skipped += 1;
            progress.on_trade(&trade_id, "skipped (no bars)");
            continue;
        };

        let attempt = catch_unwind(AssertUnwindSafe(|| {
            process_trade(config, session.date, bars, trade, seq)
        }));

        match attempt {
            Ok(Ok(outcome)) => {
                progress.on_trade(&trade_id, &describe(&outcome));
                output.outcomes.push(outcome);
            }
            Ok(Err(reason)) => {
                output.skipped += 1;
                warnings.push(format!("{trade_id}: skipped ({reason})"));
                progress.on_trade(&trade_id, &format!("skipped ({reason})"));
            }
            Err(payload) => {
                let message = panic_message(payload);
                progress.on_trade(&trade_id, &format!("error: {message}"));
                output.errors.push(TradeError { trade_id, message });
            }
        }
    }

    output.trades = trades;
    output.warnings = warnings;
    output
}

/// Simulate one trade at both volatility windows and consolidate.
///
/// `Err` is the expected skip path (insufficient data), not a failure.
fn process_trade(
    config: &RunnerConfig,
    date: NaiveDate,
    bars: &[Bar],
    trade: &TradeSummary,
    seq: u32,
) -> Result<ConsolidatedOutcome, String> {
    if trade.entry_qty == 0 || trade.entry_price <= 0.0 {
        return Err("invalid entry".into());
    }

    let entry: NaiveDateTime = date.and_time(trade.entry_time);
    let exit: Option<NaiveDateTime> = trade.exit_time.map(|t| date.and_time(t));

    let tight = simulate_window(config, bars, trade, entry, exit, config.atr.tight_period);
    let wide = simulate_window(config, bars, trade, entry, exit, config.atr.wide_period);

    if tight.is_none() && wide.is_none() {
        return Err(format!(
            "insufficient bars for volatility windows {}/{}",
            config.atr.tight_period, config.atr.wide_period,
        ));
    }

    let window = session_window(bars, entry, exit, config.eod_cutoff);
    let eod_price = window.last().map(|b| b.close);

    Ok(consolidate(trade, seq, tight, wide, eod_price))
}

/// One window's measure, plan, and walk. `None` when the measure or plan
/// is unavailable at this lookback.
fn simulate_window(
    config: &RunnerConfig,
    bars: &[Bar],
    trade: &TradeSummary,
    entry: NaiveDateTime,
    exit: Option<NaiveDateTime>,
    period: usize,
) -> Option<OutcomeRecord> {
    let measure = atr_at_time(bars, period, entry)?;
    let plan = StopPlan::build(trade.entry_price, trade.direction, measure)?;
    let window = session_window(bars, entry, exit, config.eod_cutoff);
    Some(walk(&plan, window))
}

fn describe(outcome: &ConsolidatedOutcome) -> String {
    match (&outcome.outcome, &outcome.exit_reason) {
        (Some(o), Some(r)) => format!(
            "{:?} ({:?}, max level {})",
            o,
            r,
            outcome.wide.as_ref().map_or(0, |w| w.max_level),
        ),
        _ => "no authoritative window".to_string(),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
