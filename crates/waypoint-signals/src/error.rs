//! Error types for waypoint-signals.
//!
//! None of these reach the host. Each one resolves a slot to an absent or
//! fallback value and is only logged.

use std::time::Duration;

use thiserror::Error;

/// Result type for signal source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Ways a signal source can fail to produce a value.
#[derive(Debug, Error)]
pub enum Error {
    /// Notification permission was refused.
    #[error("notification permission denied")]
    PermissionDenied,

    /// The shared deadline elapsed before the source resolved.
    #[error("signal source timed out after {0:?}")]
    SourceTimeout(Duration),

    /// The attribution query failed.
    #[error("attribution lookup failed: {0}")]
    LookupFailure(String),

    /// The join session was already closed when the source resolved.
    #[error("join session already closed")]
    SessionClosed,

    /// Reading or writing the token cache failed.
    #[error("store error: {0}")]
    Store(#[from] waypoint_store::Error),
}
