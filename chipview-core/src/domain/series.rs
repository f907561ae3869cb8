//! Derived series and the display bundle handed to the chart layer.
//!
//! Wire names follow the chart contract: every sample is `{"x": ms, "y": ...}`
//! and bundle fields are camelCase.

use serde::{Deserialize, Serialize};

/// Anything keyed on a bar timestamp (epoch milliseconds).
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// A derived scalar sample. `value` is `None` during indicator warmup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    #[serde(rename = "x")]
    pub timestamp: i64,
    #[serde(rename = "y")]
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn new(timestamp: i64, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

impl Timestamped for IndicatorPoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// One candlestick: `[open, high, low, close]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(rename = "x")]
    pub timestamp: i64,
    #[serde(rename = "y")]
    pub ohlc: [f64; 4],
}

impl Timestamped for Candle {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Day-over-day volume direction. Equal volume counts as rising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeDirection {
    Rising,
    Falling,
}

impl VolumeDirection {
    /// Color cue used by the volume chart (red up, green down).
    pub fn fill_color(self) -> &'static str {
        match self {
            VolumeDirection::Rising => "#FF0000",
            VolumeDirection::Falling => "#00AA00",
        }
    }
}

/// One volume bar, scaled to lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePoint {
    #[serde(rename = "x")]
    pub timestamp: i64,
    #[serde(rename = "y")]
    pub lots: u64,
    pub direction: VolumeDirection,
}

impl Timestamped for VolumePoint {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Everything the chart layer needs for one render cycle.
///
/// All series are clipped to the same display window and share per-index
/// timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBundle {
    pub candles: Vec<Candle>,
    pub volume: Vec<VolumePoint>,
    pub ma5: Vec<IndicatorPoint>,
    pub ma10: Vec<IndicatorPoint>,
    pub ma20: Vec<IndicatorPoint>,
    pub ma120: Vec<IndicatorPoint>,
    pub ma240: Vec<IndicatorPoint>,
    pub bollinger_upper: Vec<IndicatorPoint>,
    pub bollinger_lower: Vec<IndicatorPoint>,
    /// Largest raw (unscaled) volume inside the window; 0 when empty.
    pub max_volume: u64,
}

impl DisplayBundle {
    /// The "still loading" bundle: every series empty, `max_volume == 0`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Number of displayed trading days.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// The seven indicator series, in chart legend order.
    pub fn indicator_series(&self) -> [(&'static str, &[IndicatorPoint]); 7] {
        [
            ("ma5", self.ma5.as_slice()),
            ("ma10", self.ma10.as_slice()),
            ("ma20", self.ma20.as_slice()),
            ("ma120", self.ma120.as_slice()),
            ("ma240", self.ma240.as_slice()),
            ("bollingerUpper", self.bollinger_upper.as_slice()),
            ("bollingerLower", self.bollinger_lower.as_slice()),
        ]
    }

    /// Check that every series has one sample per candle with the candle's
    /// timestamp.
    pub fn is_aligned(&self) -> bool {
        let stamps: Vec<i64> = self.candles.iter().map(|c| c.timestamp).collect();
        let volume_ok = self.volume.len() == stamps.len()
            && self.volume.iter().zip(&stamps).all(|(v, &t)| v.timestamp == t);
        volume_ok
            && self.indicator_series().iter().all(|(_, series)| {
                series.len() == stamps.len()
                    && series.iter().zip(&stamps).all(|(p, &t)| p.timestamp == t)
            })
    }

    /// Content hash over the exact bit patterns of every sample.
    ///
    /// Two bundles share a fingerprint only if they are bit-identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for candle in &self.candles {
            hasher.update(&candle.timestamp.to_le_bytes());
            for price in candle.ohlc {
                hasher.update(&price.to_bits().to_le_bytes());
            }
        }
        for point in &self.volume {
            hasher.update(&point.timestamp.to_le_bytes());
            hasher.update(&point.lots.to_le_bytes());
            hasher.update(&[point.direction as u8]);
        }
        for (name, series) in self.indicator_series() {
            hasher.update(name.as_bytes());
            for point in series {
                hasher.update(&point.timestamp.to_le_bytes());
                match point.value {
                    Some(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_bits().to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
        hasher.update(&self.max_volume.to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: i64, v: Option<f64>) -> IndicatorPoint {
        IndicatorPoint::new(t, v)
    }

    fn one_day_bundle(t: i64) -> DisplayBundle {
        DisplayBundle {
            candles: vec![Candle {
                timestamp: t,
                ohlc: [1.0, 2.0, 0.5, 1.5],
            }],
            volume: vec![VolumePoint {
                timestamp: t,
                lots: 3,
                direction: VolumeDirection::Rising,
            }],
            ma5: vec![point(t, None)],
            ma10: vec![point(t, None)],
            ma20: vec![point(t, None)],
            ma120: vec![point(t, None)],
            ma240: vec![point(t, None)],
            bollinger_upper: vec![point(t, None)],
            bollinger_lower: vec![point(t, None)],
            max_volume: 3_000,
        }
    }

    #[test]
    fn empty_bundle() {
        let bundle = DisplayBundle::empty();
        assert!(bundle.is_empty());
        assert_eq!(bundle.max_volume, 0);
        assert!(bundle.is_aligned());
    }

    #[test]
    fn indicator_point_wire_shape() {
        let json = serde_json::to_string(&point(1_000, None)).unwrap();
        assert_eq!(json, r#"{"x":1000,"y":null}"#);
        let json = serde_json::to_string(&point(1_000, Some(2.5))).unwrap();
        assert_eq!(json, r#"{"x":1000,"y":2.5}"#);
    }

    #[test]
    fn bundle_uses_camel_case_fields() {
        let value = serde_json::to_value(one_day_bundle(5)).unwrap();
        assert!(value.get("bollingerUpper").is_some());
        assert!(value.get("maxVolume").is_some());
        assert_eq!(value["volume"][0]["direction"], "rising");
        assert_eq!(value["candles"][0]["y"][3], 1.5);
    }

    #[test]
    fn misaligned_bundle_detected() {
        let mut bundle = one_day_bundle(5);
        assert!(bundle.is_aligned());
        bundle.ma20[0].timestamp = 6;
        assert!(!bundle.is_aligned());
        let mut bundle = one_day_bundle(5);
        bundle.volume.clear();
        assert!(!bundle.is_aligned());
    }

    #[test]
    fn fingerprint_tracks_bits() {
        let a = one_day_bundle(5);
        let b = one_day_bundle(5);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = one_day_bundle(5);
        c.ma5[0].value = Some(0.0);
        assert_ne!(a.fingerprint(), c.fingerprint());

        let mut d = one_day_bundle(5);
        d.ma5[0].value = Some(-0.0);
        assert_ne!(c.fingerprint(), d.fingerprint());
    }

    #[test]
    fn direction_colors() {
        assert_eq!(VolumeDirection::Rising.fill_color(), "#FF0000");
        assert_eq!(VolumeDirection::Falling.fill_color(), "#00AA00");
    }
}
