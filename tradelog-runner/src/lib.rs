//! Batch orchestration around the journaling core.
//!
//! Modules:
//! - [`config`]: TOML-backed run configuration with a content-hash run id
//! - [`data_loader`]: CSV boundary adapters for fills and minute bars
//! - [`batch`]: per-symbol parallel pipeline from fills to outcomes
//! - [`export`]: JSON/CSV persistence of batch artifacts

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod export;

pub use batch::{run_batch, BatchProgress, BatchResult, BatchStats, SessionInput, SilentProgress, StdoutProgress};
pub use config::{AtrConfig, ConfigError, RunnerConfig};
pub use data_loader::{load_bars_csv, load_fills_csv, LoadError, LoadedBars, LoadedFills};
pub use export::{export_json, export_outcomes_csv, import_json, ExportError};
