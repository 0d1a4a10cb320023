//! Waypoint Store - Persistent Launch State
//!
//! The handshake needs only a handful of persisted scalars: whether the
//! first launch has been processed, the redirect address the server handed
//! out (if any), and the last push token the platform delivered.
//!
//! # Architecture
//!
//! - [`KeyValueStore`]: the get/set surface a host persistence layer exposes
//! - [`MemoryStore`]: in-process backend for tests and ephemeral hosts
//! - [`RocksStore`]: RocksDB-backed backend for desktop hosts
//! - [`LaunchStateStore`]: typed accessor mapping [`LaunchState`] onto fixed keys
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use waypoint_store::{LaunchStateStore, MemoryStore};
//!
//! let store = LaunchStateStore::new(Arc::new(MemoryStore::new()));
//! assert!(!store.first_launch_completed().unwrap());
//!
//! store.mark_first_launch_completed().unwrap();
//! assert!(store.load().unwrap().first_launch_completed);
//! ```

pub mod error;
pub mod launch;
pub mod memory;
pub mod rocks;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};
pub use launch::{LaunchState, LaunchStateStore};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

/// Scalar get/set surface over a host's persistent key-value storage.
///
/// Missing keys read as `false` / `None`. A value stored under a key with a
/// different type reads the same way as a missing one.
pub trait KeyValueStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<bool>;
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
    fn get_string(&self, key: &str) -> Result<Option<String>>;
    fn set_string(&self, key: &str, value: &str) -> Result<()>;
}

/// A single persisted value, tagged with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    Bool(bool),
    Text(String),
}

impl StoredValue {
    /// The boolean view of this value (`false` for text).
    #[must_use]
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// The string view of this value (`None` for booleans).
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bool(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_views() {
        assert!(StoredValue::Bool(true).as_bool());
        assert!(!StoredValue::Bool(false).as_bool());
        assert!(!StoredValue::Text("true".into()).as_bool());

        assert_eq!(StoredValue::Text("abc".into()).into_text(), Some("abc".into()));
        assert_eq!(StoredValue::Bool(true).into_text(), None);
    }

    #[test]
    fn stored_value_json_shape() {
        let json = serde_json::to_string(&StoredValue::Text("x".into())).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"x"}"#);
    }
}
