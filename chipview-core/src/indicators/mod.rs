//! Indicator calculators.
//!
//! Both are pure: bar history in, one `IndicatorPoint` per bar out. Values at
//! bar t never depend on bars after t.

pub mod bollinger;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBands};
pub use sma::Sma;

/// Moving-average windows drawn on the candlestick chart.
pub const MA_PERIODS: [usize; 5] = [5, 10, 20, 120, 240];

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low bracket the body by
/// 1.0, volume = 1000, one calendar day apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::DailyBar> {
    use crate::domain::DailyBar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            DailyBar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
