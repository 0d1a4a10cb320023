//! In-memory key-value backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::{KeyValueStore, StoredValue};

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: StoredValue) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some_and(|v| v.as_bool()))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, StoredValue::Bool(value))
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key)?.and_then(StoredValue::into_text))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, StoredValue::Text(value.to_string()))
    }
}
