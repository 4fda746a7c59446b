//! In-process stand-in for the MCE configuration service.
//!
//! [`MemoryConfigService`] answers `get_config` / `set_config` calls routed
//! through a [`LoopbackBus`](crate::LoopbackBus) and broadcasts
//! `config_change_ind` whenever a stored value actually changes. It backs
//! the integration tests and the offline mode of the CLI; it is not a model
//! of the real service beyond that wire contract.

use crate::bus::{config_change_signal, LoopbackService, GET_CONFIG, MCE_REQUEST_IF, SET_CONFIG};
use crate::change_feed::ChangeFeed;
use crate::registry::{SettingId, MAX_BRIGHTNESS_KEY};
use crate::setting::{DoubleTapMode, InhibitMode, SettingValue};
use displaysync_codec::{Message, MethodCall, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

/// Error name for reads of unknown keys.
pub const CONFIG_ERROR: &str = "com.nokia.mce.GConf.Error";
/// Error name for malformed requests.
pub const INVALID_ARGS_ERROR: &str = "org.freedesktop.DBus.Error.InvalidArgs";
/// Error name for unsupported members.
pub const UNKNOWN_METHOD_ERROR: &str = "org.freedesktop.DBus.Error.UnknownMethod";

/// A configuration service holding its values in memory.
#[derive(Default)]
pub struct MemoryConfigService {
    values: RwLock<BTreeMap<String, Value>>,
    signals: ChangeFeed<Vec<u8>>,
    unavailable: AtomicBool,
    calls_handled: AtomicU64,
}

impl MemoryConfigService {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service seeded with typical display defaults.
    pub fn with_display_defaults() -> Self {
        let service = Self::new();
        for (id, value) in display_defaults() {
            service.insert(id.descriptor().remote_key, value.encode());
        }
        service.insert(MAX_BRIGHTNESS_KEY, Value::Int32(5));
        service
    }

    /// Stores a value without broadcasting.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    /// Reads a stored value.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Stores a value and broadcasts a change if it differs.
    ///
    /// Returns true if the stored value changed.
    pub fn update(&self, key: &str, value: Value) -> bool {
        let changed = {
            let mut values = self.values.write();
            if values.get(key) == Some(&value) {
                false
            } else {
                values.insert(key.to_string(), value.clone());
                true
            }
        };
        if changed {
            self.broadcast(key, value);
        }
        changed
    }

    /// Simulates the service dropping off the bus: calls get no reply.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Copy of all stored values.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.read().clone()
    }

    /// Replaces stored values without broadcasting.
    pub fn restore(&self, values: BTreeMap<String, Value>) {
        *self.values.write() = values;
    }

    /// Number of method calls answered so far.
    pub fn calls_handled(&self) -> u64 {
        self.calls_handled.load(Ordering::SeqCst)
    }

    fn broadcast(&self, key: &str, value: Value) {
        match config_change_signal(key, value).encode() {
            Ok(bytes) => self.signals.emit(bytes),
            Err(e) => warn!(key, error = %e, "failed to encode change signal"),
        }
    }

    fn get_config(&self, call: &MethodCall) -> Message {
        let Some(key) = call.args.first().and_then(Value::as_text) else {
            return Message::error(INVALID_ARGS_ERROR, "get_config expects a key");
        };
        match self.value(key) {
            Some(value) => Message::reply(value),
            None => Message::error(CONFIG_ERROR, format!("no such key: {key}")),
        }
    }

    fn set_config(&self, call: &MethodCall) -> Message {
        let (Some(key), Some(value)) = (call.args.first().and_then(Value::as_text), call.args.get(1))
        else {
            return Message::error(INVALID_ARGS_ERROR, "set_config expects a key and a value");
        };
        let changed = self.update(key, value.clone());
        debug!(key, %value, changed, "set_config");
        Message::reply(Value::Bool(true))
    }
}

impl LoopbackService for MemoryConfigService {
    fn handle_call(&self, call: &MethodCall) -> Option<Message> {
        if self.unavailable.load(Ordering::SeqCst) {
            return None;
        }
        self.calls_handled.fetch_add(1, Ordering::SeqCst);

        if call.interface != MCE_REQUEST_IF {
            return Some(Message::error(
                UNKNOWN_METHOD_ERROR,
                format!("unknown interface {}", call.interface),
            ));
        }
        let reply = match call.member.as_str() {
            GET_CONFIG => self.get_config(call),
            SET_CONFIG => self.set_config(call),
            other => Message::error(UNKNOWN_METHOD_ERROR, format!("unknown method {other}")),
        };
        Some(reply)
    }

    fn subscribe_signals(&self) -> Receiver<Vec<u8>> {
        self.signals.subscribe()
    }
}

/// Factory defaults for every registered setting, in registry order.
pub fn display_defaults() -> [(SettingId, SettingValue); 11] {
    [
        (SettingId::Brightness, SettingValue::Integer(3)),
        (SettingId::DimTimeout, SettingValue::Integer(30)),
        (SettingId::BlankTimeout, SettingValue::Integer(3)),
        (SettingId::InhibitMode, SettingValue::Inhibit(InhibitMode::Off)),
        (SettingId::AdaptiveDimmingEnabled, SettingValue::Boolean(true)),
        (SettingId::LowPowerModeEnabled, SettingValue::Boolean(false)),
        (SettingId::AmbientLightSensorEnabled, SettingValue::Boolean(true)),
        (SettingId::AutoBrightnessEnabled, SettingValue::Boolean(true)),
        (
            SettingId::DoubleTapMode,
            SettingValue::DoubleTap(DoubleTapMode::Enabled),
        ),
        (SettingId::LidSensorEnabled, SettingValue::Boolean(true)),
        (SettingId::LidSensorFilteringEnabled, SettingValue::Boolean(true)),
    ]
}
