//! Serializable runner configuration.

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradelog_core::reconstruct::ReconstructPolicy;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Volatility window settings.
///
/// Two independent lookbacks over the minute-bar series: the tight window
/// matches the classic 14-bar measure; the wide window is 5x that, standing
/// in for the 14-bar measure on five-minute bars. The wide window is
/// authoritative for the final win/loss label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtrConfig {
    pub tight_period: usize,
    pub wide_period: usize,
}

impl Default for AtrConfig {
    fn default() -> Self {
        Self {
            tight_period: 14,
            wide_period: 70,
        }
    }
}

/// Complete configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub atr: AtrConfig,
    /// Fixed end-of-day cutoff (exchange time) bounding trades without an
    /// explicit exit.
    pub eod_cutoff: NaiveTime,
    pub policy: ReconstructPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            atr: AtrConfig::default(),
            eod_cutoff: NaiveTime::from_hms_opt(15, 30, 0).expect("valid cutoff"),
            policy: ReconstructPolicy::Fifo,
        }
    }
}

impl RunnerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.atr.tight_period == 0 || self.atr.wide_period == 0 {
            return Err(ConfigError::Invalid(
                "volatility periods must be >= 1".into(),
            ));
        }
        if self.atr.tight_period >= self.atr.wide_period {
            return Err(ConfigError::Invalid(format!(
                "tight period ({}) must be below wide period ({})",
                self.atr.tight_period, self.atr.wide_period,
            )));
        }
        Ok(())
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share a run id, so their artifacts
    /// are directly comparable.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).expect("RunnerConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
