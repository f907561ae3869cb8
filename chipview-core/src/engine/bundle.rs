//! Display bundle construction.
//!
//! Every series is computed over the complete history first and clipped to the
//! display window last, so the first visible indicator values keep their full
//! lookback.

use rayon::prelude::*;
use tracing::debug;

use super::volume::volume_points;
use super::window::clip;
use crate::config::EngineConfig;
use crate::data::schema::{validate_history, RawBar};
use crate::domain::{Candle, DailyBar, DisplayBundle, IndicatorPoint};
use crate::error::EngineError;
use crate::indicators::{Bollinger, Sma, MA_PERIODS};

/// Build the bundle for `bars` (ascending, unique dates) and `cutoff`.
///
/// An empty history yields `DisplayBundle::empty()`.
pub fn build_bundle(
    bars: &[DailyBar],
    cutoff: i64,
    config: &EngineConfig,
) -> Result<DisplayBundle, EngineError> {
    config.validate()?;

    if bars.is_empty() {
        debug!("empty history, returning empty bundle");
        return Ok(DisplayBundle::empty());
    }

    if let Some(pos) = bars.windows(2).position(|w| w[0].timestamp >= w[1].timestamp) {
        return Err(EngineError::invalid(format!(
            "history must be strictly ascending by date (bars {} and {})",
            pos,
            pos + 1
        )));
    }

    let averages = MA_PERIODS
        .par_iter()
        .map(|&period| Sma::new(period)?.compute(bars))
        .collect::<Result<Vec<Vec<IndicatorPoint>>, EngineError>>()?;
    let [ma5, ma10, ma20, ma120, ma240]: [Vec<IndicatorPoint>; 5] = averages
        .try_into()
        .map_err(|_| EngineError::invalid("moving average count mismatch"))?;

    let bands = Bollinger::new(config.bollinger_period, config.bollinger_multiplier)?.compute(bars)?;

    let candles: Vec<Candle> = bars
        .iter()
        .map(|bar| Candle {
            timestamp: bar.timestamp,
            ohlc: bar.ohlc(),
        })
        .collect();
    let volume = volume_points(bars, config.lot_size);

    let max_volume = bars
        .iter()
        .filter(|bar| bar.timestamp >= cutoff)
        .map(|bar| bar.volume)
        .max()
        .unwrap_or(0);

    let bundle = DisplayBundle {
        candles: clip(&candles, cutoff),
        volume: clip(&volume, cutoff),
        ma5: clip(&ma5, cutoff),
        ma10: clip(&ma10, cutoff),
        ma20: clip(&ma20, cutoff),
        ma120: clip(&ma120, cutoff),
        ma240: clip(&ma240, cutoff),
        bollinger_upper: clip(&bands.upper, cutoff),
        bollinger_lower: clip(&bands.lower, cutoff),
        max_volume,
    };

    debug!(
        history = bars.len(),
        displayed = bundle.len(),
        ma240_defined = bundle.ma240.iter().filter(|p| p.is_defined()).count(),
        max_volume,
        "bundle built"
    );
    Ok(bundle)
}

/// Validate wire bars, then build. Convenience for callers without a worker.
pub fn bundle_from_raw(
    raw: &[RawBar],
    cutoff: i64,
    config: &EngineConfig,
) -> Result<DisplayBundle, EngineError> {
    let bars = validate_history(raw, config.strict_ohlc)?;
    build_bundle(&bars, cutoff, config)
}
