//! ChipView Runner — background computation for the chart view.
//!
//! This crate builds on `chipview-core` to provide:
//! - A worker thread with a private rayon pool that builds display bundles
//! - Request numbering so that only the newest request is ever delivered
//! - `ChartSession`, the non-blocking handle a view polls for results

pub mod session;
pub mod worker;

pub use session::{ChartSession, RequestState, SessionError};
pub use worker::{spawn_worker, RequestId, WorkerCommand, WorkerResponse};
