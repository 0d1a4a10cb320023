//! Error types for waypoint-gate.

use thiserror::Error;

/// Result type for gate setup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling a gate.
///
/// Running the gate never fails; these only arise before the first launch
/// decision is attempted.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The handshake client could not be built.
    #[error("Handshake client error: {0}")]
    Handshake(#[from] waypoint_handshake::Error),
}
