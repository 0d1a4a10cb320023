//! Error types for waypoint-store.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing launch state.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend failure (RocksDB error, poisoned lock).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage directory could not be created.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
