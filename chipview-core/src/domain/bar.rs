//! DailyBar — one validated trading day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validated OHLCV bar for a single trading day.
///
/// `timestamp` is UTC midnight of `date` in milliseconds since the Unix epoch;
/// every derived series is keyed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DailyBar {
    /// Build a bar, deriving the timestamp from the date.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            timestamp: date_timestamp_ms(date),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True if every price is finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }

    /// OHLC sanity: positive prices with `low <= {open, close} <= high`.
    pub fn is_sane(&self) -> bool {
        if !self.is_finite() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    /// `[open, high, low, close]`, the candle payload order.
    pub fn ohlc(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// UTC midnight of `date` in epoch milliseconds.
pub fn date_timestamp_ms(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis()
}
