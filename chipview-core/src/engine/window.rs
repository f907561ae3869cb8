//! Display window clipping.
//!
//! Older bars stay in the history only to seed indicator lookback; the chart
//! shows samples at or after the cutoff.

use chrono::{Months, NaiveDate};

use crate::domain::{date_timestamp_ms, Timestamped};

/// Samples with `timestamp >= cutoff`, in their original order.
pub fn clip<T: Timestamped + Clone>(series: &[T], cutoff: i64) -> Vec<T> {
    series
        .iter()
        .filter(|sample| sample.timestamp() >= cutoff)
        .cloned()
        .collect()
}

/// Cutoff for "the last `months` months" ending at `today`.
///
/// Lands on UTC midnight, so the bar dated exactly `months` back is visible.
/// Short months clamp to their last day (May 31 minus three months is
/// February 28/29).
pub fn cutoff_months_before(today: NaiveDate, months: u32) -> i64 {
    let start = today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);
    date_timestamp_ms(start)
}

/// Cutoff at the start of `date`.
pub fn cutoff_at(date: NaiveDate) -> i64 {
    date_timestamp_ms(date)
}
