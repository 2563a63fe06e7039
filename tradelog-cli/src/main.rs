//! TradeLog CLI — batch run, reconstruction, and config inspection.
//!
//! Commands:
//! - `run` — full pipeline: fills + bars in, consolidated outcomes out
//! - `reconstruct` — rebuild trades from a fill export, no simulation
//! - `info` — print the resolved configuration and its run id

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use tradelog_core::domain::{Bar, TradeSummary};
use tradelog_core::reconstruct::{reconstruct, ReconstructPolicy};
use tradelog_runner::batch::{run_batch, BatchResult, SessionInput, SilentProgress, StdoutProgress};
use tradelog_runner::config::RunnerConfig;
use tradelog_runner::data_loader::{load_bars_csv, load_fills_csv};
use tradelog_runner::export::{export_json, export_outcomes_csv};

#[derive(Parser)]
#[command(
    name = "tradelog",
    about = "TradeLog CLI — intraday trade journaling and outcome simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: reconstruct trades and simulate outcomes.
    Run {
        /// Broker fill export (CSV, tab- or comma-delimited).
        #[arg(long)]
        fills: PathBuf,

        /// Minute-bar CSV covering the session.
        #[arg(long)]
        bars: PathBuf,

        /// Session date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the reconstruction policy: fifo or position.
        #[arg(long)]
        policy: Option<String>,

        /// Process only the first N fills (for quick spot checks).
        #[arg(long)]
        limit: Option<usize>,

        /// Reconstruct and report, but skip simulation and export.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Output directory for result JSON and outcome CSV.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Suppress per-trade progress output.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
    /// Rebuild trades from a fill export and print them, no simulation.
    Reconstruct {
        /// Broker fill export (CSV, tab- or comma-delimited).
        #[arg(long)]
        fills: PathBuf,

        /// Session date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// Reconstruction policy: fifo or position.
        #[arg(long, default_value = "fifo")]
        policy: String,
    },
    /// Print the resolved configuration and its run id.
    Info {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            fills,
            bars,
            date,
            config,
            policy,
            limit,
            dry_run,
            output_dir,
            quiet,
        } => run_pipeline(
            &fills, &bars, &date, config, policy, limit, dry_run, &output_dir, quiet,
        ),
        Commands::Reconstruct {
            fills,
            date,
            policy,
        } => run_reconstruct(&fills, &date, &policy),
        Commands::Info { config } => run_info(config),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn parse_policy(raw: &str) -> Result<ReconstructPolicy> {
    match raw {
        "fifo" => Ok(ReconstructPolicy::Fifo),
        "position" => Ok(ReconstructPolicy::Position),
        _ => bail!("unknown policy '{raw}'. Valid: fifo, position"),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RunnerConfig> {
    match path {
        Some(p) => {
            RunnerConfig::load(&p).with_context(|| format!("loading config {}", p.display()))
        }
        None => Ok(RunnerConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    fills_path: &Path,
    bars_path: &Path,
    date: &str,
    config_path: Option<PathBuf>,
    policy: Option<String>,
    limit: Option<usize>,
    dry_run: bool,
    output_dir: &Path,
    quiet: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let mut config = load_config(config_path)?;
    if let Some(raw) = policy {
        config.policy = parse_policy(&raw)?;
    }

    let loaded_fills = load_fills_csv(fills_path)?;
    for err in &loaded_fills.row_errors {
        eprintln!("fills: {err}");
    }
    let mut fills = loaded_fills.fills;
    if let Some(n) = limit {
        fills.truncate(n);
    }
    if fills.is_empty() {
        bail!("no usable fills in {}", fills_path.display());
    }

    if dry_run {
        let trades = reconstruct_all(config.policy, date, &fills);
        print_trades(&trades);
        println!("Dry run — no simulation, nothing written.");
        return Ok(());
    }

    let loaded_bars = load_bars_csv(bars_path)?;
    for err in &loaded_bars.row_errors {
        eprintln!("bars: {err}");
    }

    let mut bars_by_symbol: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in loaded_bars.bars {
        bars_by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
    }
    for bars in bars_by_symbol.values_mut() {
        bars.sort_by_key(|b| b.timestamp);
    }

    let session = SessionInput {
        date,
        fills,
        bars_by_symbol,
    };

    let result = if quiet {
        run_batch(&config, &session, &SilentProgress)
    } else {
        run_batch(&config, &session, &StdoutProgress)
    };

    print_run_summary(&result);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let stem = format!("{}_{}", date.format("%Y%m%d"), &result.run_id[..8]);
    let json_path = output_dir.join(format!("{stem}.json"));
    let csv_path = output_dir.join(format!("{stem}_outcomes.csv"));
    export_json(&result, &json_path)?;
    export_outcomes_csv(&result.outcomes, &csv_path)?;
    println!("Artifacts saved to: {}", json_path.display());
    println!("                    {}", csv_path.display());

    if !result.errors.is_empty() {
        for err in &result.errors {
            eprintln!("Error for {}: {}", err.trade_id, err.message);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_reconstruct(fills_path: &Path, date: &str, policy: &str) -> Result<()> {
    let date = parse_date(date)?;
    let policy = parse_policy(policy)?;

    let loaded = load_fills_csv(fills_path)?;
    for err in &loaded.row_errors {
        eprintln!("fills: {err}");
    }
    if loaded.fills.is_empty() {
        bail!("no usable fills in {}", fills_path.display());
    }

    let trades = reconstruct_all(policy, date, &loaded.fills);
    print_trades(&trades);
    Ok(())
}

fn run_info(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("=== TradeLog Config ===");
    println!("Policy:         {:?}", config.policy);
    println!("Tight window:   {} bars", config.atr.tight_period);
    println!("Wide window:    {} bars", config.atr.wide_period);
    println!("EOD cutoff:     {}", config.eod_cutoff.format("%H:%M"));
    println!("Run id:         {}", config.run_id());
    Ok(())
}

/// Reconstruct every symbol in the fill tape, collecting warnings to stderr.
fn reconstruct_all(
    policy: ReconstructPolicy,
    date: NaiveDate,
    fills: &[tradelog_core::domain::Fill],
) -> Vec<TradeSummary> {
    let mut by_symbol: BTreeMap<&str, Vec<tradelog_core::domain::Fill>> = BTreeMap::new();
    for fill in fills {
        by_symbol.entry(&fill.symbol).or_default().push(fill.clone());
    }

    let mut trades = Vec::new();
    for (symbol, fills) in &by_symbol {
        let (mut symbol_trades, warnings) = reconstruct(policy, symbol, date, fills);
        for warn in &warnings {
            eprintln!("WARNING: {warn}");
        }
        trades.append(&mut symbol_trades);
    }
    trades
}

fn print_trades(trades: &[TradeSummary]) {
    println!();
    println!(
        "{:<8} {:<6} {:<10} {:>9} {:>6} {:<10} {:>9} {:>10} {:<6}",
        "Symbol", "Dir", "Entry", "Price", "Qty", "Exit", "Price", "P&L", "Status"
    );
    println!("{}", "-".repeat(82));
    for trade in trades {
        println!(
            "{:<8} {:<6} {:<10} {:>9.4} {:>6} {:<10} {:>9} {:>10} {:<6}",
            trade.symbol,
            format!("{:?}", trade.direction).to_ascii_uppercase(),
            trade.entry_time.format("%H:%M:%S"),
            trade.entry_price,
            trade.entry_qty,
            trade
                .exit_time
                .map_or("-".into(), |t| t.format("%H:%M:%S").to_string()),
            trade
                .exit_price
                .map_or("-".into(), |p| format!("{p:.4}")),
            trade
                .pnl_total
                .map_or("-".into(), |p| format!("{p:+.2}")),
            if trade.closed { "closed" } else { "open" },
        );
    }
    println!();
    println!("Trades: {}", trades.len());
}

fn print_run_summary(result: &BatchResult) {
    println!();
    println!("=== Batch Result ===");
    println!("Date:           {}", result.date);
    println!("Run id:         {}", &result.run_id[..16]);
    println!("Trades:         {}", result.trades.len());
    println!("Processed:      {}", result.stats.processed);
    println!("Skipped:        {}", result.stats.skipped);
    println!("Errors:         {}", result.stats.errors);
    println!();

    let winners = result.outcomes.iter().filter(|o| o.is_winner).count();
    if !result.outcomes.is_empty() {
        println!("--- Outcomes ---");
        println!(
            "Win rate:       {:.1}% ({winners}/{})",
            winners as f64 / result.outcomes.len() as f64 * 100.0,
            result.outcomes.len()
        );
        let pnl_rs: Vec<f64> = result.outcomes.iter().filter_map(|o| o.pnl_r).collect();
        if !pnl_rs.is_empty() {
            let total: f64 = pnl_rs.iter().sum();
            println!("Total R:        {total:+.2}");
            println!("Avg R:          {:+.2}", total / pnl_rs.len() as f64);
        }
        println!();
    }

    for warn in &result.warnings {
        println!("WARNING: {warn}");
    }
}
