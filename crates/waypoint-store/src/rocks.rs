//! Persistent storage using RocksDB.

use std::path::Path;

use rocksdb::{Options, DB};

use crate::error::Result;
use crate::{KeyValueStore, StoredValue};

/// RocksDB-backed key-value store. Values are stored as JSON.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create storage at the given path, creating missing parent
    /// directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &StoredValue) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put(key.as_bytes(), bytes)?;
        tracing::trace!(key, "persisted launch value");
        Ok(())
    }
}

impl KeyValueStore for RocksStore {
    fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some_and(|v| v.as_bool()))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, &StoredValue::Bool(value))
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key)?.and_then(StoredValue::into_text))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, &StoredValue::Text(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("app").join("launch");

        let store = RocksStore::open(&nested).unwrap();
        store.set_bool("flag", true).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn path_through_a_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"not a directory").unwrap();

        let result = RocksStore::open(file.join("db"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn storage_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        store.set_bool("flag", true).unwrap();
        store.set_string("addr", "https://promo.example").unwrap();

        assert!(store.get_bool("flag").unwrap());
        assert_eq!(
            store.get_string("addr").unwrap().as_deref(),
            Some("https://promo.example")
        );
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.set_bool("flag", true).unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert!(store.get_bool("flag").unwrap());
        assert!(!store.get_bool("other").unwrap());
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        store.db.put(b"bad", b"not json").unwrap();

        assert!(store.get_string("bad").is_err());
    }
}
