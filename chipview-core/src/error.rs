//! Engine error taxonomy.
//!
//! An empty history is not an error: the engine answers it with
//! `DisplayBundle::empty()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Bad window length, multiplier, configuration value, or a bar that is
    /// missing a required field.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A bar whose fields are present but unusable. Fails the whole invocation.
    #[error("malformed bar at index {index}: {reason}")]
    MalformedBar { index: usize, reason: String },
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedBar {
            index,
            reason: reason.into(),
        }
    }
}
