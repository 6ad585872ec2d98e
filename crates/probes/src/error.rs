//! Probe error types

use thiserror::Error;

/// Errors from executing a probe.
///
/// A probe error is the monitored condition being reported, not a
/// pipeline failure: it becomes the `error` field of a result.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network-level failure reaching the target
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    /// Probe exceeded its configured timeout
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Target responded, but not as a healthy service would
    #[error("{0}")]
    Failed(String),

    /// Check argument failed its validation pattern
    #[error("invalid argument {name}: {value:?}")]
    InvalidArgument { name: String, value: String },

    /// Check references a probe type missing from the registry
    #[error("unknown probe type: {0}")]
    UnknownProbe(String),
}
