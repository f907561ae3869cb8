//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::sma::Sma;
use crate::domain::{DailyBar, IndicatorPoint};
use crate::error::EngineError;

/// Canonical chart settings: 20 days, 2 sigma.
pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Three aligned band series, one point per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<IndicatorPoint>,
    pub middle: Vec<IndicatorPoint>,
    pub lower: Vec<IndicatorPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bollinger {
    center: Sma,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, EngineError> {
        if period < 1 {
            return Err(EngineError::invalid("Bollinger period must be >= 1"));
        }
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(EngineError::invalid(format!(
                "Bollinger multiplier must be finite and >= 0, got {multiplier}"
            )));
        }
        Ok(Self {
            center: Sma::new(period)?,
            multiplier,
        })
    }

    pub fn period(&self) -> usize {
        self.center.period()
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn lookback(&self) -> usize {
        self.center.lookback()
    }

    pub fn compute(&self, bars: &[DailyBar]) -> Result<BollingerBands, EngineError> {
        let middle = self.center.compute(bars)?;
        let period = self.period();

        let mut upper = Vec::with_capacity(bars.len());
        let mut lower = Vec::with_capacity(bars.len());

        for (i, (bar, center)) in bars.iter().zip(&middle).enumerate() {
            let Some(mean) = center.value else {
                upper.push(IndicatorPoint::new(bar.timestamp, None));
                lower.push(IndicatorPoint::new(bar.timestamp, None));
                continue;
            };

            let window = &bars[i + 1 - period..=i];
            let variance = window
                .iter()
                .map(|b| {
                    let diff = b.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let width = self.multiplier * variance.sqrt();

            upper.push(IndicatorPoint::new(bar.timestamp, Some(mean + width)));
            lower.push(IndicatorPoint::new(bar.timestamp, Some(mean - width)));
        }

        Ok(BollingerBands {
            upper,
            middle,
            lower,
        })
    }
}
