//! Typed display settings.

use crate::config::EngineConfig;
use crate::engine::{SettingChange, SyncEngine};
use crate::error::SyncResult;
use crate::local_store::{KeyValueStore, LocalKey, LocalSettings};
use crate::registry::SettingId;
use crate::setting::{DoubleTapMode, InhibitMode, SettingValue};
use crate::transport::ConfigTransport;
use displaysync_codec::Value;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Typed view over the remote-backed settings and the orientation lock.
///
/// Setters return true when the value changed; see [`SyncEngine::set`].
pub struct DisplaySettings<T: ConfigTransport, S: KeyValueStore> {
    engine: SyncEngine<T>,
    local: LocalSettings<S>,
}

impl<T: ConfigTransport, S: KeyValueStore> DisplaySettings<T, S> {
    /// Connects to the service and loads every setting.
    pub fn connect(config: EngineConfig, transport: Arc<T>, store: S) -> SyncResult<Self> {
        let engine = SyncEngine::new(config, transport)?;
        Ok(Self::new(engine, LocalSettings::new(store)))
    }

    /// Combines an engine and local settings.
    pub fn new(engine: SyncEngine<T>, local: LocalSettings<S>) -> Self {
        Self { engine, local }
    }

    /// The sync engine.
    pub fn engine(&self) -> &SyncEngine<T> {
        &self.engine
    }

    /// Mutable access to the sync engine.
    pub fn engine_mut(&mut self) -> &mut SyncEngine<T> {
        &mut self.engine
    }

    /// The local settings.
    pub fn local(&self) -> &LocalSettings<S> {
        &self.local
    }

    /// Brightness level.
    pub fn brightness(&self) -> i32 {
        self.integer(SettingId::Brightness)
    }

    /// Sets the brightness level.
    pub fn set_brightness(&mut self, value: i32) -> bool {
        self.engine.set(SettingId::Brightness, SettingValue::Integer(value))
    }

    /// Seconds before dimming.
    pub fn dim_timeout(&self) -> i32 {
        self.integer(SettingId::DimTimeout)
    }

    /// Sets the dim timeout.
    pub fn set_dim_timeout(&mut self, value: i32) -> bool {
        self.engine.set(SettingId::DimTimeout, SettingValue::Integer(value))
    }

    /// Seconds between dimming and blanking.
    pub fn blank_timeout(&self) -> i32 {
        self.integer(SettingId::BlankTimeout)
    }

    /// Sets the blank timeout.
    pub fn set_blank_timeout(&mut self, value: i32) -> bool {
        self.engine.set(SettingId::BlankTimeout, SettingValue::Integer(value))
    }

    /// Blanking inhibit policy.
    pub fn inhibit_mode(&self) -> InhibitMode {
        self.engine
            .get(SettingId::InhibitMode)
            .as_inhibit_mode()
            .unwrap_or(InhibitMode::Off)
    }

    /// Sets the blanking inhibit policy.
    pub fn set_inhibit_mode(&mut self, mode: InhibitMode) -> bool {
        self.engine.set(SettingId::InhibitMode, SettingValue::Inhibit(mode))
    }

    /// Whether adaptive dimming is on.
    pub fn adaptive_dimming_enabled(&self) -> bool {
        self.boolean(SettingId::AdaptiveDimmingEnabled)
    }

    /// Toggles adaptive dimming.
    pub fn set_adaptive_dimming_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::AdaptiveDimmingEnabled, SettingValue::Boolean(enabled))
    }

    /// Whether low power mode is on.
    pub fn low_power_mode_enabled(&self) -> bool {
        self.boolean(SettingId::LowPowerModeEnabled)
    }

    /// Toggles low power mode.
    pub fn set_low_power_mode_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::LowPowerModeEnabled, SettingValue::Boolean(enabled))
    }

    /// Whether the ambient light sensor is used.
    pub fn ambient_light_sensor_enabled(&self) -> bool {
        self.boolean(SettingId::AmbientLightSensorEnabled)
    }

    /// Toggles the ambient light sensor.
    pub fn set_ambient_light_sensor_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::AmbientLightSensorEnabled, SettingValue::Boolean(enabled))
    }

    /// Whether brightness follows ambient light.
    pub fn auto_brightness_enabled(&self) -> bool {
        self.boolean(SettingId::AutoBrightnessEnabled)
    }

    /// Toggles automatic brightness.
    pub fn set_auto_brightness_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::AutoBrightnessEnabled, SettingValue::Boolean(enabled))
    }

    /// Double-tap to wake policy.
    pub fn double_tap_mode(&self) -> DoubleTapMode {
        self.engine
            .get(SettingId::DoubleTapMode)
            .as_double_tap_mode()
            .unwrap_or(DoubleTapMode::Disabled)
    }

    /// Sets the double-tap to wake policy.
    pub fn set_double_tap_mode(&mut self, mode: DoubleTapMode) -> bool {
        self.engine
            .set(SettingId::DoubleTapMode, SettingValue::DoubleTap(mode))
    }

    /// Whether the lid sensor is used.
    pub fn lid_sensor_enabled(&self) -> bool {
        self.boolean(SettingId::LidSensorEnabled)
    }

    /// Toggles the lid sensor.
    pub fn set_lid_sensor_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::LidSensorEnabled, SettingValue::Boolean(enabled))
    }

    /// Whether lid events are filtered with the ambient light sensor.
    pub fn lid_sensor_filtering_enabled(&self) -> bool {
        self.boolean(SettingId::LidSensorFilteringEnabled)
    }

    /// Toggles lid event filtering.
    pub fn set_lid_sensor_filtering_enabled(&mut self, enabled: bool) -> bool {
        self.engine
            .set(SettingId::LidSensorFilteringEnabled, SettingValue::Boolean(enabled))
    }

    /// Orientation lock, `"dynamic"` unless set.
    pub fn orientation_lock(&self) -> Value {
        self.local.get(LocalKey::OrientationLock)
    }

    /// Stores the orientation lock. Every call is announced.
    pub fn set_orientation_lock(&self, value: impl Into<Value>) -> bool {
        self.local.set(LocalKey::OrientationLock, value.into())
    }

    /// Queries the number of brightness levels. Not cached.
    pub fn maximum_brightness(&mut self) -> SyncResult<i32> {
        self.engine.maximum_brightness()
    }

    /// Subscribes to changes of remote-backed settings.
    pub fn subscribe(&self) -> Receiver<SettingChange> {
        self.engine.subscribe()
    }

    /// Subscribes to orientation lock writes.
    pub fn orientation_lock_changes(&self) -> Receiver<String> {
        self.local.watch()
    }

    /// Applies queued remote changes. See [`SyncEngine::dispatch_pending`].
    pub fn dispatch_pending(&mut self) -> usize {
        self.engine.dispatch_pending()
    }

    fn integer(&self, id: SettingId) -> i32 {
        self.engine.get(id).as_integer().unwrap_or_default()
    }

    fn boolean(&self, id: SettingId) -> bool {
        self.engine.get(id).as_bool().unwrap_or_default()
    }
}
