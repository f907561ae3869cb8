//! Volume series: lot scaling and day-over-day direction.

use crate::domain::{DailyBar, VolumeDirection, VolumePoint};

/// Direction of every bar relative to its predecessor in the full history.
///
/// Equal volume counts as rising; the first bar has no predecessor and is
/// rising by convention.
pub fn classify(bars: &[DailyBar]) -> Vec<VolumeDirection> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = if i > 0 { bars[i - 1].volume } else { bar.volume };
            if bar.volume >= prev {
                VolumeDirection::Rising
            } else {
                VolumeDirection::Falling
            }
        })
        .collect()
}

/// Shares to whole lots, rounding down.
pub fn to_lots(volume: u64, lot_size: u64) -> u64 {
    volume / lot_size.max(1)
}

/// Volume points for the whole history. Clip afterwards, never before.
pub fn volume_points(bars: &[DailyBar], lot_size: u64) -> Vec<VolumePoint> {
    bars.iter()
        .zip(classify(bars))
        .map(|(bar, direction)| VolumePoint {
            timestamp: bar.timestamp,
            lots: to_lots(bar.volume, lot_size),
            direction,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use VolumeDirection::{Falling, Rising};

    fn bars_with_volume(volumes: &[u64]) -> Vec<DailyBar> {
        let mut bars = make_bars(&vec![10.0; volumes.len()]);
        for (bar, &v) in bars.iter_mut().zip(volumes) {
            bar.volume = v;
        }
        bars
    }

    #[test]
    fn first_bar_is_rising() {
        assert_eq!(classify(&bars_with_volume(&[500])), vec![Rising]);
    }

    #[test]
    fn direction_follows_previous_bar() {
        let bars = bars_with_volume(&[1000, 2000, 2000, 1500, 3000]);
        assert_eq!(
            classify(&bars),
            vec![Rising, Rising, Rising, Falling, Rising]
        );
    }

    #[test]
    fn lots_floor() {
        assert_eq!(to_lots(1999, 1000), 1);
        assert_eq!(to_lots(999, 1000), 0);
        assert_eq!(to_lots(25_000, 1000), 25);
        assert_eq!(to_lots(7, 1), 7);
    }

    #[test]
    fn points_carry_direction_and_lots() {
        let bars = bars_with_volume(&[4000, 2500]);
        let points = volume_points(&bars, 1000);
        assert_eq!(points[0].lots, 4);
        assert_eq!(points[1].lots, 2);
        assert_eq!(points[1].direction, Falling);
        assert_eq!(points[1].timestamp, bars[1].timestamp);
    }
}
