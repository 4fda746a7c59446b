//! Common read/write/watch surface over the two kinds of settings.

use crate::engine::{SettingChange, SyncEngine};
use crate::local_store::{KeyValueStore, LocalKey, LocalSettings};
use crate::registry::SettingId;
use crate::setting::SettingValue;
use crate::transport::ConfigTransport;
use displaysync_codec::Value;
use std::sync::mpsc::Receiver;

/// A keyed set of observable settings.
///
/// Implemented by the remote-backed [`SyncEngine`] and by the local-store
/// backed [`LocalSettings`]. The two differ in how `write` gates
/// notifications: the engine only notifies on actual change, the local
/// store announces every write.
pub trait PropertySource {
    /// Setting identifier.
    type Key: Copy;
    /// Setting value.
    type Value;
    /// Notification delivered to watchers.
    type Change;

    /// Reads the current value.
    fn read(&self, key: Self::Key) -> Self::Value;

    /// Writes a value. Returns true if the write was accepted and changed
    /// observable state.
    fn write(&mut self, key: Self::Key, value: Self::Value) -> bool;

    /// Subscribes to notifications.
    fn watch(&self) -> Receiver<Self::Change>;
}

impl<T: ConfigTransport> PropertySource for SyncEngine<T> {
    type Key = SettingId;
    type Value = SettingValue;
    type Change = SettingChange;

    fn read(&self, key: SettingId) -> SettingValue {
        self.get(key)
    }

    fn write(&mut self, key: SettingId, value: SettingValue) -> bool {
        self.set(key, value)
    }

    fn watch(&self) -> Receiver<SettingChange> {
        self.subscribe()
    }
}

impl<S: KeyValueStore> PropertySource for LocalSettings<S> {
    type Key = LocalKey;
    type Value = Value;
    type Change = String;

    fn read(&self, key: LocalKey) -> Value {
        self.get(key)
    }

    fn write(&mut self, key: LocalKey, value: Value) -> bool {
        self.set(key, value)
    }

    fn watch(&self) -> Receiver<String> {
        LocalSettings::watch(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryStore;
    use crate::service::display_defaults;
    use crate::transport::MockTransport;
    use crate::EngineConfig;
    use std::sync::Arc;

    /// Writes `value` twice and returns how many notifications arrived.
    fn write_twice<P: PropertySource>(source: &mut P, key: P::Key, value: P::Value) -> usize
    where
        P::Value: Clone,
    {
        let rx = source.watch();
        source.write(key, value.clone());
        source.write(key, value);
        rx.try_iter().count()
    }

    #[test]
    fn engine_gates_repeated_writes() {
        let transport = MockTransport::new();
        for (id, value) in display_defaults() {
            transport.set_value(id.descriptor().remote_key, value.encode());
        }
        let mut engine = SyncEngine::new(EngineConfig::default(), Arc::new(transport)).unwrap();

        let count = write_twice(&mut engine, SettingId::BlankTimeout, SettingValue::Integer(10));
        assert_eq!(count, 1);
        assert_eq!(engine.read(SettingId::BlankTimeout), SettingValue::Integer(10));
    }

    #[test]
    fn local_settings_announce_every_write() {
        let mut local = LocalSettings::new(MemoryStore::new());
        let count = write_twice(&mut local, LocalKey::OrientationLock, Value::from("portrait"));
        assert_eq!(count, 2);
        assert_eq!(local.read(LocalKey::OrientationLock), Value::from("portrait"));
    }
}
