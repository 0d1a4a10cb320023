//! Error types for waypoint-handshake.

use thiserror::Error;

/// Result type for handshake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a handshake produced no redirect address.
///
/// [`HandshakeClient::exchange`](crate::HandshakeClient::exchange) maps all
/// of these onto "continue"; they only show up in logs and in
/// [`try_exchange`](crate::HandshakeClient::try_exchange).
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the body could not be read.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned {0}")]
    Status(reqwest::StatusCode),

    /// The endpoint answered 2xx with an empty body.
    #[error("empty response body")]
    EmptyBody,

    /// The body is not usable as an address.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An encoded payload could not be decoded.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
