//! Persisting batch artifacts: pretty JSON for the full result, flat CSV
//! for the consolidated outcome rows.
//!
//! JSON is the archival format and round-trips the whole `BatchResult`.
//! The CSV flattens each outcome to one row for spreadsheet review; nested
//! per-window records are reduced to their headline fields.

use std::path::Path;

use thiserror::Error;

use crate::batch::{BatchResult, SCHEMA_VERSION};
use tradelog_core::aggregate::ConsolidatedOutcome;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported schema version {found} (expected <= {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

/// Write the complete batch result as pretty-printed JSON.
pub fn export_json(result: &BatchResult, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read a batch result back from JSON, rejecting future schema versions.
pub fn import_json(path: &Path) -> Result<BatchResult, ExportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let result: BatchResult = serde_json::from_str(&text)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

/// Write consolidated outcomes as a flat CSV, one row per trade.
pub fn export_outcomes_csv(
    outcomes: &[ConsolidatedOutcome],
    path: &Path,
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "trade_id",
        "symbol",
        "date",
        "direction",
        "entry_price",
        "entry_time",
        "atr_tight",
        "atr_wide",
        "stop_price",
        "max_level",
        "minutes_to_level1",
        "reached_level2",
        "reached_level3",
        "stop_hit",
        "outcome",
        "exit_reason",
        "is_winner",
        "pnl_r",
        "eod_price",
    ])?;

    for row in outcomes {
        let wide = row.wide.as_ref();
        writer.write_record([
            row.trade_id.clone(),
            row.symbol.clone(),
            row.date.format("%Y-%m-%d").to_string(),
            format!("{:?}", row.direction).to_ascii_uppercase(),
            fmt_price(row.entry_price),
            row.entry_time.format("%H:%M:%S").to_string(),
            opt_price(row.tight.as_ref().map(|r| r.atr_value)),
            opt_price(wide.map(|r| r.atr_value)),
            opt_price(wide.map(|r| r.stop_price)),
            wide.map_or(0, |r| r.max_level).to_string(),
            row.minutes_to_level1.map_or(String::new(), |m| m.to_string()),
            row.reached_level2.to_string(),
            row.reached_level3.to_string(),
            wide.is_some_and(|r| r.stop_hit).to_string(),
            row.outcome.map_or(String::new(), |o| format!("{o:?}").to_ascii_uppercase()),
            row.exit_reason.map_or(String::new(), exit_reason_code),
            row.is_winner.to_string(),
            opt_price(row.pnl_r),
            opt_price(row.eod_price),
        ])?;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn exit_reason_code(reason: tradelog_core::walk::ExitReason) -> String {
    use tradelog_core::walk::ExitReason;
    match reason {
        ExitReason::StopHit => "STOP_HIT",
        ExitReason::R5Hit => "R5_HIT",
        ExitReason::Eod => "EOD",
    }
    .to_string()
}

fn fmt_price(value: f64) -> String {
    format!("{value:.4}")
}

fn opt_price(value: Option<f64>) -> String {
    value.map_or(String::new(), fmt_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchStats, TradeError};
    use chrono::NaiveDate;

    fn empty_result() -> BatchResult {
        BatchResult {
            schema_version: SCHEMA_VERSION,
            run_id: "abc123".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            trades: Vec::new(),
            outcomes: Vec::new(),
            warnings: vec!["MU: orphan exit".into()],
            errors: vec![TradeError {
                trade_id: "MU_021326_0930_1".into(),
                message: "boom".into(),
            }],
            stats: BatchStats {
                processed: 0,
                skipped: 1,
                warnings: 1,
                errors: 1,
            },
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("tradelog_export_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn json_round_trip() {
        let path = temp_path("result.json");
        let result = empty_result();
        export_json(&result, &path).unwrap();

        let loaded = import_json(&path).unwrap();
        assert_eq!(loaded.run_id, result.run_id);
        assert_eq!(loaded.stats, result.stats);
        assert_eq!(loaded.warnings, result.warnings);
        assert_eq!(loaded.errors[0].trade_id, result.errors[0].trade_id);
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let path = temp_path("future.json");
        let mut result = empty_result();
        result.schema_version = SCHEMA_VERSION + 1;
        export_json(&result, &path).unwrap();

        assert!(matches!(
            import_json(&path),
            Err(ExportError::SchemaVersion { .. })
        ));
    }

    #[test]
    fn csv_has_header_and_no_rows_for_empty_batch() {
        let path = temp_path("outcomes.csv");
        export_outcomes_csv(&[], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("trade_id,symbol,date"));
        assert_eq!(lines.next(), None);
    }
}
