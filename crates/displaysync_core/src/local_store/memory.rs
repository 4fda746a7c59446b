//! In-memory key-value store for testing.

use super::KeyValueStore;
use crate::change_feed::ChangeFeed;
use crate::error::StoreResult;
use displaysync_codec::Value;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

/// An in-memory key-value store.
///
/// Suitable for unit tests and for sessions that do not need persistence.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, Value>>,
    feed: ChangeFeed<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing values.
    pub fn with_values(values: BTreeMap<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
            feed: ChangeFeed::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: Value) -> StoreResult<()> {
        self.values.write().insert(key.to_string(), value);
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

    #[test]
    fn read_write() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.read("/k").unwrap(), None);

        store.write("/k", Value::Int32(1)).unwrap();
        assert_eq!(store.read("/k").unwrap(), Some(Value::Int32(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn preloaded_values() {
        let mut values = BTreeMap::new();
        values.insert("/k".to_string(), Value::from("x"));
        let store = MemoryStore::with_values(values);
        assert_eq!(store.read("/k").unwrap(), Some(Value::from("x")));
    }

    #[test]
    fn watchers_see_every_write() {
        let store = MemoryStore::new();
        let rx = store.watch();
        store.write("/a", Value::Bool(true)).unwrap();
        store.write("/b", Value::Bool(true)).unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["/a", "/b"]);
    }
}
