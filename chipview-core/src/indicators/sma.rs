//! Simple Moving Average (SMA).
//!
//! Trailing mean of close prices over a fixed window.
//! Lookback: period - 1 (first defined value at index period-1).

use crate::domain::{DailyBar, IndicatorPoint};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        if period < 1 {
            return Err(EngineError::invalid("SMA period must be >= 1"));
        }
        Ok(Self {
            period,
            name: format!("ma{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of bars before the first defined value.
    pub fn lookback(&self) -> usize {
        self.period - 1
    }

    /// One point per bar; `None` until a full window is available.
    ///
    /// Each window is summed from scratch so the value at bar `i` depends only
    /// on bars `i - period + 1 ..= i`, bit for bit.
    pub fn compute(&self, bars: &[DailyBar]) -> Result<Vec<IndicatorPoint>, EngineError> {
        if bars.is_empty() {
            return Err(EngineError::invalid(format!(
                "{}: cannot compute over an empty series",
                self.name
            )));
        }

        Ok(bars
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorPoint::new(bar.timestamp, self.value_at(bars, i)))
            .collect())
    }

    /// Mean close over the window ending at `index`, if one fits.
    pub(crate) fn value_at(&self, bars: &[DailyBar], index: usize) -> Option<f64> {
        if index < self.lookback() || index >= bars.len() {
            return None;
        }
        let window = &bars[index + 1 - self.period..=index];
        let sum: f64 = window.iter().map(|bar| bar.close).sum();
        Some(sum / self.period as f64)
    }
}
