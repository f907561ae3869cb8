//! ChipView Core — the indicator engine behind the broker chip dashboard.
//!
//! This crate contains:
//! - Domain types (daily bars, indicator points, candles, volume, display bundle)
//! - Input schema validation for loosely typed backend history
//! - Moving average and Bollinger band calculators
//! - The bundle engine: full-history indicators clipped to a display window
//! - Broker chip data schemas and the HTTP backend client
//! - TOML configuration

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;

pub use config::{ChipViewConfig, EngineConfig};
pub use domain::{DailyBar, DisplayBundle, IndicatorPoint};
pub use engine::{build_bundle, bundle_from_raw};
pub use error::EngineError;
