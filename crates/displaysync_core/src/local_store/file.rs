//! File-backed key-value store.

use super::KeyValueStore;
use crate::change_feed::ChangeFeed;
use crate::error::{StoreError, StoreResult};
use displaysync_codec::{decode_values, encode_values, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

/// A key-value store persisted as a single CBOR file.
///
/// The whole map is kept in memory and the file is rewritten on every
/// write through a sibling temporary file and a rename.
///
/// # Example
///
/// ```no_run
/// use displaysync_core::{FileStore, KeyValueStore};
/// use displaysync_codec::Value;
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("settings.cbor")).unwrap();
/// store.write("/lipstick/orientationLock", Value::from("portrait")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
    feed: ChangeFeed<String>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let values = match fs::read(path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => decode_values(&bytes).map_err(|e| StoreError::Corrupted(e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
            feed: ChangeFeed::new(),
        })
    }

    /// Returns the path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of all stored values.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.read().clone()
    }

    /// Replaces the whole content and persists it. No change is announced.
    pub fn replace_all(&self, values: BTreeMap<String, Value>) -> StoreResult<()> {
        let mut guard = self.values.write();
        self.persist(&values)?;
        *guard = values;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> StoreResult<()> {
        let bytes = encode_values(values).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: Value) -> StoreResult<()> {
        {
            let mut values = self.values.write();
            let mut next = values.clone();
            next.insert(key.to_string(), value);
            self.persist(&next)?;
            *values = next;
        }
        self.feed.emit(key.to_string());
        Ok(())
    }

    fn watch(&self) -> Receiver<String> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.cbor")).unwrap();
        assert_eq!(store.read("/k").unwrap(), None);
    }

    #[test]
    fn writes_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.cbor");

        {
            let store = FileStore::open(&path).unwrap();
            store
                .write("/lipstick/orientationLock", Value::from("landscape"))
                .unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.read("/lipstick/orientationLock").unwrap(),
            Some(Value::from("landscape"))
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupted_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.cbor");
        fs::write(&path, b"\xff\xff garbage").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn replace_all_is_silent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.cbor")).unwrap();
        let rx = store.watch();

        let mut values = BTreeMap::new();
        values.insert("/a".to_string(), Value::Int32(1));
        store.replace_all(values.clone()).unwrap();

        assert_eq!(store.snapshot(), values);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn write_announces_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.cbor")).unwrap();
        let rx = store.watch();
        store.write("/a", Value::Bool(false)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "/a");
    }
}
