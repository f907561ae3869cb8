//! TOML configuration for the engine and the backend client.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::error::EngineError;
use crate::indicators::bollinger::{DEFAULT_MULTIPLIER, DEFAULT_PERIOD};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipViewConfig {
    pub engine: EngineConfig,
    pub backend: BackendConfig,
}

impl ChipViewConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Indicator engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    /// Shares per lot for the volume chart.
    pub lot_size: u64,
    /// Default display window, in months before today.
    pub display_months: u32,
    /// Reject bars whose open/close fall outside low..high or whose prices are
    /// not positive. Non-finite prices are always rejected.
    pub strict_ohlc: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bollinger_period: DEFAULT_PERIOD,
            bollinger_multiplier: DEFAULT_MULTIPLIER,
            lot_size: 1000,
            display_months: 3,
            strict_ohlc: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.bollinger_period < 1 {
            return Err(EngineError::invalid("engine.bollinger_period must be >= 1"));
        }
        if !self.bollinger_multiplier.is_finite() || self.bollinger_multiplier < 0.0 {
            return Err(EngineError::invalid(format!(
                "engine.bollinger_multiplier must be finite and >= 0, got {}",
                self.bollinger_multiplier
            )));
        }
        if self.lot_size == 0 {
            return Err(EngineError::invalid("engine.lot_size must be >= 1"));
        }
        Ok(())
    }
}

/// Where the chip/history API lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Path template for daily history; `{ticker}` is replaced per request.
    pub history_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            timeout_secs: 30,
            history_path: "/api/stock_history/{ticker}".into(),
        }
    }
}
