//! Local key-value settings that live outside the configuration service.
//!
//! The orientation lock is owned by the home screen rather than by MCE. It
//! is persisted in a local [`KeyValueStore`] and exposed through
//! [`LocalSettings`], which shares the read/write/watch surface of the sync
//! engine but not its cache, registry or change gate.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreResult;
use displaysync_codec::Value;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::warn;

/// A persistent key-value store with its own change channel.
///
/// # Invariants
///
/// - `read` returns the last value written for a key, or `None`
/// - every successful `write` is announced on all `watch` receivers,
///   whether or not the value differs from the previous one
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn read(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Stores `value` under `key`.
    fn write(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Subscribes to written keys.
    fn watch(&self) -> Receiver<String>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: Value) -> StoreResult<()> {
        (**self).write(key, value)
    }

    fn watch(&self) -> Receiver<String> {
        (**self).watch()
    }
}

/// Settings backed by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKey {
    /// Display orientation lock.
    OrientationLock,
}

impl LocalKey {
    /// All local keys.
    pub const ALL: [LocalKey; 1] = [LocalKey::OrientationLock];

    /// Store key.
    pub fn key(self) -> &'static str {
        match self {
            LocalKey::OrientationLock => "/lipstick/orientationLock",
        }
    }

    /// Value reported while nothing has been stored.
    pub fn default_value(self) -> Value {
        match self {
            LocalKey::OrientationLock => Value::Text("dynamic".into()),
        }
    }

    /// Resolves a store key.
    pub fn from_key(key: &str) -> Option<Self> {
        LocalKey::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// Read/write access to [`LocalKey`] settings.
pub struct LocalSettings<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> LocalSettings<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads a setting, falling back to its default when unset or unreadable.
    pub fn get(&self, key: LocalKey) -> Value {
        match self.store.read(key.key()) {
            Ok(Some(value)) => value,
            Ok(None) => key.default_value(),
            Err(e) => {
                warn!(key = key.key(), error = %e, "local store read failed, using default");
                key.default_value()
            }
        }
    }

    /// Writes a setting straight to the store.
    ///
    /// There is no comparison with the current value; the store announces
    /// every write. Returns false if the store rejected the write.
    pub fn set(&self, key: LocalKey, value: Value) -> bool {
        match self.store.write(key.key(), value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key.key(), error = %e, "local store write failed");
                false
            }
        }
    }

    /// Subscribes to changes of local settings.
    ///
    /// Keys the store holds for other owners are filtered out by
    /// [`LocalKey::from_key`] on the receiving side.
    pub fn watch(&self) -> Receiver<String> {
        self.store.watch()
    }
}
