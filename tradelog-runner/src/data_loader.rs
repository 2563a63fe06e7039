//! CSV boundary adapters: broker fill exports and minute-bar files.
//!
//! These are thin collaborators feeding the core; nothing here simulates or
//! reconstructs. Fill exports arrive tab- or comma-delimited (tab wins when
//! both appear in the header), often with trailing delimiters. Row-level
//! parse failures are collected and reported, never fatal — the batch
//! contract is best effort.

use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;
use tradelog_core::domain::{Bar, Fill, FillSide};

/// Errors from the loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("empty file: {0}")]
    Empty(String),
}

/// Parsed fills plus per-row diagnostics.
#[derive(Debug)]
pub struct LoadedFills {
    pub fills: Vec<Fill>,
    /// Row-level parse failures, one string per bad row.
    pub row_errors: Vec<String>,
    /// Delimiter detected from the header line.
    pub delimiter: u8,
}

/// Parsed bars plus per-row diagnostics.
#[derive(Debug)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub row_errors: Vec<String>,
}

/// Detect the delimiter from the header line. Tab takes priority — it is
/// the more reliable indicator in broker exports that mix both.
fn detect_delimiter(header: &str) -> u8 {
    if header.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

fn parse_side(raw: &str) -> Option<FillSide> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "B" | "BUY" => Some(FillSide::Buy),
        "S" | "SELL" => Some(FillSide::Sell),
        "SS" | "SHORT_SELL" => Some(FillSide::ShortSell),
        _ => None,
    }
}

/// Load a broker fill export.
///
/// Columns: Time, Symbol, Side, Price, Qty, Route, Account (route/account
/// optional). Side codes: B, S, SS. Rows keep their file order, which is
/// chronological in broker exports.
pub fn load_fills_csv(path: &Path) -> Result<LoadedFills, LoadError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;

    let header = match text.lines().find(|l| !l.trim().is_empty()) {
        Some(h) => h,
        None => return Err(LoadError::Empty(display)),
    };
    let delimiter = detect_delimiter(header);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut fills = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let row_num = idx + 2; // 1-based, after the header
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(format!("row {row_num}: {e}"));
                continue;
            }
        };

        // Trailing delimiters produce empty tail columns; ignore them.
        let cols: Vec<&str> = record.iter().collect();
        let filled = cols.iter().rposition(|c| !c.is_empty()).map_or(0, |p| p + 1);
        if filled < 5 {
            row_errors.push(format!("row {row_num}: insufficient columns ({filled})"));
            continue;
        }

        let time = match NaiveTime::parse_from_str(cols[0], "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(cols[0], "%H:%M"))
        {
            Ok(t) => t,
            Err(e) => {
                row_errors.push(format!("row {row_num}: bad time '{}': {e}", cols[0]));
                continue;
            }
        };

        let side = match parse_side(cols[2]) {
            Some(s) => s,
            None => {
                row_errors.push(format!("row {row_num}: unknown side '{}'", cols[2]));
                continue;
            }
        };

        let price: f64 = match cols[3].parse() {
            Ok(p) => p,
            Err(e) => {
                row_errors.push(format!("row {row_num}: bad price '{}': {e}", cols[3]));
                continue;
            }
        };

        let qty: u32 = match cols[4].parse() {
            Ok(q) => q,
            Err(e) => {
                row_errors.push(format!("row {row_num}: bad qty '{}': {e}", cols[4]));
                continue;
            }
        };

        fills.push(Fill {
            time,
            symbol: cols[1].to_ascii_uppercase(),
            side,
            price,
            qty,
            route: cols.get(5).copied().unwrap_or("").to_string(),
            account: cols.get(6).copied().unwrap_or("").to_string(),
        });
    }

    Ok(LoadedFills {
        fills,
        row_errors,
        delimiter,
    })
}

/// Load a minute-bar CSV.
///
/// Columns: symbol, timestamp (YYYY-MM-DD HH:MM or with seconds), open,
/// high, low, close, volume. Insane bars (high < low etc.) are dropped
/// with a row error.
pub fn load_bars_csv(path: &Path) -> Result<LoadedBars, LoadError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: display.clone(),
            source,
        })?;

    let mut bars = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let row_num = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(format!("row {row_num}: {e}"));
                continue;
            }
        };
        if record.len() < 7 {
            row_errors.push(format!("row {row_num}: insufficient columns ({})", record.len()));
            continue;
        }

        let timestamp = match NaiveDateTime::parse_from_str(&record[1], "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&record[1], "%Y-%m-%d %H:%M"))
        {
            Ok(t) => t,
            Err(e) => {
                row_errors.push(format!("row {row_num}: bad timestamp '{}': {e}", &record[1]));
                continue;
            }
        };

        let mut prices = [0.0_f64; 4];
        let mut bad = false;
        for (i, p) in prices.iter_mut().enumerate() {
            match record[i + 2].parse() {
                Ok(v) => *p = v,
                Err(e) => {
                    row_errors.push(format!("row {row_num}: bad price '{}': {e}", &record[i + 2]));
                    bad = true;
                    break;
                }
            }
        }
        if bad {
            continue;
        }

        let volume: u64 = match record[6].parse() {
            Ok(v) => v,
            Err(e) => {
                row_errors.push(format!("row {row_num}: bad volume '{}': {e}", &record[6]));
                continue;
            }
        };

        let bar = Bar {
            symbol: record[0].to_ascii_uppercase(),
            timestamp,
            open: prices[0],
            high: prices[1],
            low: prices[2],
            close: prices[3],
            volume,
        };
        if !bar.is_sane() {
            row_errors.push(format!("row {row_num}: insane OHLC for {}", bar.symbol));
            continue;
        }
        bars.push(bar);
    }

    if bars.is_empty() && row_errors.is_empty() {
        return Err(LoadError::Empty(display));
    }

    Ok(LoadedBars { bars, row_errors })
}
