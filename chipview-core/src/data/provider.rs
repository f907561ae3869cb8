//! Backend trait and structured data errors.
//!
//! The `Backend` trait abstracts over the chip/history API so the HTTP client
//! can be swapped for an in-memory source in tests.

use chrono::NaiveDate;
use thiserror::Error;

use super::chip::{BrokerTrade, ChipData};
use super::schema::RawBar;

/// Structured error types for data operations.
///
/// Displayable as-is in CLI output.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Chip data lookup: a ticker (code or name) and an optional date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipQuery {
    pub ticker: String,
    pub range: Option<(NaiveDate, NaiveDate)>,
}

impl ChipQuery {
    /// Trims the ticker; a blank ticker is rejected before any request.
    pub fn new(ticker: &str) -> Result<Self, DataError> {
        Ok(Self {
            ticker: non_blank("ticker", ticker)?,
            range: None,
        })
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if start > end {
            return Err(DataError::InvalidQuery(format!(
                "start date {start} is after end date {end}"
            )));
        }
        self.range = Some((start, end));
        Ok(self)
    }
}

pub(crate) fn non_blank(what: &str, value: &str) -> Result<String, DataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DataError::InvalidQuery(format!("{what} must not be blank")));
    }
    Ok(trimmed.to_string())
}

/// Source of chip data, broker detail and daily history.
pub trait Backend: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Broker buy/sell concentration for a ticker.
    fn chip_data(&self, query: &ChipQuery) -> Result<ChipData, DataError>;

    /// Daily net trades of one broker in one ticker.
    fn broker_trades(&self, ticker: &str, broker: &str) -> Result<Vec<BrokerTrade>, DataError>;

    /// Full daily history for a ticker, oldest first.
    fn stock_history(&self, ticker: &str) -> Result<Vec<RawBar>, DataError>;
}
