//! Input schema for daily history and its validation into `DailyBar`s.
//!
//! Upstream responses are loosely typed: prices arrive as numbers or numeric
//! strings, and fields may be missing. Everything is checked here, once, so
//! the engine only ever sees clean bars.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::warn;

use super::provider::DataError;
use crate::domain::DailyBar;
use crate::error::EngineError;

/// A price as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawNumber {
    fn from(v: f64) -> Self {
        RawNumber::Number(v)
    }
}

impl From<&str> for RawNumber {
    fn from(v: &str) -> Self {
        RawNumber::Text(v.to_string())
    }
}

/// A share count as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Integer(u64),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<u64> for RawCount {
    fn from(v: u64) -> Self {
        RawCount::Integer(v)
    }
}

/// One daily bar before validation. All fields optional so that a missing
/// field is reported by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub open: Option<RawNumber>,
    #[serde(default)]
    pub high: Option<RawNumber>,
    #[serde(default)]
    pub low: Option<RawNumber>,
    #[serde(default)]
    pub close: Option<RawNumber>,
    #[serde(default)]
    pub volume: Option<RawCount>,
}

impl RawBar {
    pub fn new(date: &str, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date: Some(date.to_string()),
            open: Some(open.into()),
            high: Some(high.into()),
            low: Some(low.into()),
            close: Some(close.into()),
            volume: Some(volume.into()),
        }
    }
}

/// Parse a bar date: `YYYY-MM-DD`, `YYYY/MM/DD`, RFC 3339, or a naive
/// `YYYY-MM-DDTHH:MM:SS`. Datetimes keep their UTC calendar date.
pub fn parse_bar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc().date());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn price(index: usize, field: &str, raw: &Option<RawNumber>) -> Result<f64, EngineError> {
    let value = match raw {
        None => {
            return Err(EngineError::invalid(format!(
                "bar {index}: missing required field `{field}`"
            )))
        }
        Some(RawNumber::Number(v)) => Some(*v),
        Some(RawNumber::Text(s)) => parse_decimal(s),
        Some(RawNumber::Other(_)) => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(EngineError::malformed(index, format!("{field} is not finite ({v})"))),
        None => Err(EngineError::malformed(index, format!("{field} is not numeric"))),
    }
}

/// Exclusive upper bound of `u64` as a float (2^64).
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn count(index: usize, raw: &Option<RawCount>) -> Result<u64, EngineError> {
    let whole = |v: f64| {
        (v.is_finite() && (0.0..U64_LIMIT).contains(&v) && v.fract() == 0.0).then_some(v as u64)
    };
    let value = match raw {
        None => {
            return Err(EngineError::invalid(format!(
                "bar {index}: missing required field `volume`"
            )))
        }
        Some(RawCount::Integer(v)) => Some(*v),
        Some(RawCount::Number(v)) => whole(*v),
        Some(RawCount::Text(s)) => parse_decimal(s).and_then(whole),
        Some(RawCount::Other(_)) => None,
    };
    value.ok_or_else(|| EngineError::malformed(index, "volume is not a non-negative integer"))
}

/// Convert one wire bar. `index` is its position in the input, for errors.
pub fn validate_bar(index: usize, raw: &RawBar, strict_ohlc: bool) -> Result<DailyBar, EngineError> {
    let date_text = raw.date.as_deref().ok_or_else(|| {
        EngineError::invalid(format!("bar {index}: missing required field `date`"))
    })?;
    let date = parse_bar_date(date_text)
        .ok_or_else(|| EngineError::malformed(index, format!("unparseable date {date_text:?}")))?;

    let bar = DailyBar::new(
        date,
        price(index, "open", &raw.open)?,
        price(index, "high", &raw.high)?,
        price(index, "low", &raw.low)?,
        price(index, "close", &raw.close)?,
        count(index, &raw.volume)?,
    );

    if strict_ohlc && !bar.is_sane() {
        return Err(EngineError::malformed(
            index,
            format!(
                "OHLC out of range (open {}, high {}, low {}, close {})",
                bar.open, bar.high, bar.low, bar.close
            ),
        ));
    }
    Ok(bar)
}

/// Validate a whole history: every bar converted, sorted ascending by date,
/// duplicate dates rejected.
pub fn validate_history(raw: &[RawBar], strict_ohlc: bool) -> Result<Vec<DailyBar>, EngineError> {
    let mut indexed = raw
        .iter()
        .enumerate()
        .map(|(i, bar)| validate_bar(i, bar, strict_ohlc).map(|b| (i, b)))
        .collect::<Result<Vec<(usize, DailyBar)>, EngineError>>()?;

    if indexed.windows(2).any(|w| w[0].1.timestamp > w[1].1.timestamp) {
        warn!(bars = indexed.len(), "history not in date order, sorting");
        indexed.sort_by_key(|(_, bar)| bar.timestamp);
    }

    if let Some(w) = indexed.windows(2).find(|w| w[0].1.date == w[1].1.date) {
        let (index, bar) = &w[1];
        return Err(EngineError::malformed(
            *index,
            format!("duplicate date {}", bar.date),
        ));
    }

    Ok(indexed.into_iter().map(|(_, bar)| bar).collect())
}

/// Parse a JSON array of bars.
pub fn history_from_json(text: &str) -> Result<Vec<RawBar>, DataError> {
    serde_json::from_str(text)
        .map_err(|e| DataError::ResponseFormatChanged(format!("history JSON: {e}")))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: Option<String>,
    open: Option<String>,
    high: Option<String>,
    low: Option<String>,
    close: Option<String>,
    volume: Option<String>,
}

/// Read history from CSV with a `date,open,high,low,close,volume` header.
/// Empty cells become missing fields.
pub fn history_from_csv<R: Read>(reader: R) -> Result<Vec<RawBar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv_reader
        .deserialize::<CsvRow>()
        .map(|row| {
            let row = row.map_err(|e| DataError::Csv(e.to_string()))?;
            Ok(RawBar {
                date: row.date,
                open: row.open.map(RawNumber::Text),
                high: row.high.map(RawNumber::Text),
                low: row.low.map(RawNumber::Text),
                close: row.close.map(RawNumber::Text),
                volume: row.volume.map(RawCount::Text),
            })
        })
        .collect()
}
