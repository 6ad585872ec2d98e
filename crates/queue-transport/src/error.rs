//! Transport error types

use thiserror::Error;

/// Errors from the queue or dedup-store transports.
///
/// Transport failures are isolated to the affected destination or
/// message; retry policy belongs to the transport itself, not here.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Queue push failed
    #[error("push to queue {queue} failed: {reason}")]
    Push { queue: String, reason: String },

    /// Queue pop failed
    #[error("pop from queue {queue} failed: {reason}")]
    Pop { queue: String, reason: String },

    /// Dedup-store operation failed
    #[error("dedup store access failed: {0}")]
    Store(String),
}
