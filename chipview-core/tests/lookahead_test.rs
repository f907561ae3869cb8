//! Look-ahead contamination tests for the moving averages and Bollinger bands.
//!
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..150) and the full series
//! (bars 0..300). Values for bars 0..150 must be identical between both runs.

use chipview_core::domain::DailyBar;
use chipview_core::indicators::{Bollinger, Sma, MA_PERIODS};
use chipview_core::IndicatorPoint;
use chrono::NaiveDate;

/// N bars of a deterministic pseudo-random walk.
fn make_test_bars(n: usize) -> Vec<DailyBar> {
    let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut price = 100.0;

    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            price = (price + change).max(10.0);

            let open = price - 0.5;
            let close = price + 0.3;
            let high = open.max(close) + 2.0;
            let low = open.min(close) - 2.0;
            DailyBar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000 + i as u64 * 100,
            )
        })
        .collect()
}

fn assert_no_lookahead(name: &str, full: &[IndicatorPoint], truncated: &[IndicatorPoint]) {
    assert!(truncated.len() <= full.len(), "{name}: truncated run is longer");
    for (i, (t, f)) in truncated.iter().zip(full).enumerate() {
        assert_eq!(t.timestamp, f.timestamp, "{name}: timestamp mismatch at bar {i}");
        match (t.value, f.value) {
            (None, None) => {}
            (Some(t), Some(f)) => assert!(
                (t - f).abs() < 1e-10,
                "{name}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
            ),
            (t, f) => panic!("{name}: definedness mismatch at bar {i}: truncated={t:?}, full={f:?}"),
        }
    }
}

#[test]
fn lookahead_moving_averages() {
    let bars = make_test_bars(300);
    for period in MA_PERIODS {
        let sma = Sma::new(period).unwrap();
        let full = sma.compute(&bars).unwrap();
        let truncated = sma.compute(&bars[..150]).unwrap();
        assert_no_lookahead(sma.name(), &full, &truncated);
    }
}

#[test]
fn lookahead_bollinger() {
    let bars = make_test_bars(300);
    let bollinger = Bollinger::new(20, 2.0).unwrap();
    let full = bollinger.compute(&bars).unwrap();
    let truncated = bollinger.compute(&bars[..150]).unwrap();

    assert_no_lookahead("bollinger_upper", &full.upper, &truncated.upper);
    assert_no_lookahead("bollinger_middle", &full.middle, &truncated.middle);
    assert_no_lookahead("bollinger_lower", &full.lower, &truncated.lower);
}

#[test]
fn truncation_point_is_never_defined_early() {
    let bars = make_test_bars(300);
    for period in MA_PERIODS {
        let sma = Sma::new(period).unwrap();
        let out = sma.compute(&bars).unwrap();
        let first_defined = out.iter().position(|p| p.value.is_some());
        assert_eq!(first_defined, Some(period - 1), "{}", sma.name());
    }
}
