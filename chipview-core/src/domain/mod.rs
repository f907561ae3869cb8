//! Domain types for ChipView

pub mod bar;
pub mod series;

pub use bar::{date_timestamp_ms, DailyBar};
pub use series::{Candle, DisplayBundle, IndicatorPoint, Timestamped, VolumeDirection, VolumePoint};
