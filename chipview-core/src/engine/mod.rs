//! Time-series indicator engine: full history in, clipped display bundle out.

pub mod bundle;
pub mod volume;
pub mod window;

pub use bundle::{build_bundle, bundle_from_raw};
pub use volume::{classify, to_lots, volume_points};
pub use window::{clip, cutoff_at, cutoff_months_before};
