//! Sync engine: the local cache of remote-backed settings.

use crate::change_feed::ChangeFeed;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::registry::{
    lookup, reverse_lookup, SettingDescriptor, SettingId, SettingKind, MAX_BRIGHTNESS_KEY, REGISTRY,
};
use crate::setting::SettingValue;
use crate::transport::{ConfigTransport, RemoteChange, Subscription};
use displaysync_codec::Value;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Notification that a cached setting changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingChange {
    /// Setting that changed.
    pub id: SettingId,
    /// Its new value.
    pub value: SettingValue,
}

/// Counters describing engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Fetch attempts issued, including retries and live queries.
    pub fetches: u64,
    /// Pushes issued.
    pub pushes: u64,
    /// Pushes the transport reported as failed.
    pub push_failures: u64,
    /// Remote change events received.
    pub remote_events: u64,
    /// Remote change events for keys outside the registry.
    pub ignored_events: u64,
    /// Remote values that did not decode to their declared kind.
    pub decode_failures: u64,
    /// Local change notifications emitted.
    pub notifications: u64,
}

/// Mirrors the registered settings of the remote configuration service.
///
/// # Lifecycle
///
/// Construction blocks until every registered key has been fetched, then
/// subscribes to remote change broadcasts. From then on every setting is
/// synced: reads are served from the cache, writes go to the cache first
/// and are pushed without waiting, and remote changes are applied when the
/// owner calls [`SyncEngine::dispatch_pending`].
///
/// # Change detection
///
/// A notification is emitted if and only if a cached value actually
/// changes, whether the change comes from [`SyncEngine::set`] or from the
/// remote side. Echoes of the engine's own writes are therefore silent.
///
/// Dropping the engine drops its [`Subscription`], which releases the
/// transport's side of it.
///
/// All mutation goes through `&mut self`, so the cache needs no lock: the
/// owning thread is the only one that can touch it.
pub struct SyncEngine<T: ConfigTransport> {
    config: EngineConfig,
    transport: Arc<T>,
    values: Vec<SettingValue>,
    remote: Subscription,
    feed: ChangeFeed<SettingChange>,
    stats: SyncStats,
}

impl<T: ConfigTransport> SyncEngine<T> {
    /// Fetches every registered setting and subscribes to remote changes.
    ///
    /// # Errors
    ///
    /// Fails with [`SyncError::InitialFetch`] if any key cannot be fetched
    /// within the retry policy or decodes to the wrong kind, and with the
    /// transport's error if the subscription cannot be set up. No engine
    /// with a partially populated cache is ever returned.
    pub fn new(config: EngineConfig, transport: Arc<T>) -> SyncResult<Self> {
        let mut stats = SyncStats::default();
        let mut values = Vec::with_capacity(REGISTRY.len());

        for descriptor in &REGISTRY {
            let value = fetch_initial(&config, transport.as_ref(), descriptor, &mut stats).map_err(
                |e| SyncError::InitialFetch {
                    key: descriptor.remote_key,
                    source: Box::new(e),
                },
            )?;
            debug!(setting = %descriptor.id, %value, "fetched");
            values.push(value);
        }

        let remote = transport.subscribe()?;

        Ok(Self {
            config,
            transport,
            values,
            remote,
            feed: ChangeFeed::new(),
            stats,
        })
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns activity counters.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Returns the cached value of a setting. Never blocks.
    pub fn get(&self, id: SettingId) -> SettingValue {
        self.values[id.index()]
    }

    /// All cached values, in registry order.
    pub fn snapshot(&self) -> Vec<(SettingId, SettingValue)> {
        SettingId::ALL.into_iter().zip(self.values.iter().copied()).collect()
    }

    /// Subscribes to local change notifications.
    pub fn subscribe(&self) -> Receiver<SettingChange> {
        self.feed.subscribe()
    }

    /// Writes a setting.
    ///
    /// Writing the cached value again is a no-op. Otherwise the cache is
    /// updated, the new value is pushed to the service without waiting for
    /// an answer, and one notification is emitted. A failed push is logged
    /// and not rolled back. A value of the wrong kind is ignored.
    ///
    /// Returns true if the cached value changed.
    pub fn set(&mut self, id: SettingId, value: SettingValue) -> bool {
        let descriptor = lookup(id);
        if value.kind() != descriptor.kind {
            warn!(
                setting = %id,
                expected = descriptor.kind.name(),
                got = value.kind().name(),
                "ignoring write of the wrong kind"
            );
            return false;
        }
        if self.values[id.index()] == value {
            return false;
        }

        self.values[id.index()] = value;
        self.stats.pushes += 1;
        if let Err(e) = self.transport.push(descriptor.remote_key, value.encode()) {
            self.stats.push_failures += 1;
            warn!(setting = %id, error = %e, "push failed, cache kept");
        }
        self.notify(id, value);
        true
    }

    /// Applies a change broadcast by the service.
    ///
    /// Unknown keys are ignored, values that do not decode to the declared
    /// kind are logged and leave the cache untouched.
    ///
    /// Returns true if the cached value changed.
    pub fn on_remote_change(&mut self, key: &str, raw: &Value) -> bool {
        self.stats.remote_events += 1;

        let Some(id) = reverse_lookup(key) else {
            self.stats.ignored_events += 1;
            debug!(key, "ignoring change of untracked key");
            return false;
        };
        let value = match lookup(id).kind.decode(key, raw) {
            Ok(value) => value,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(setting = %id, error = %e, "keeping cached value");
                return false;
            }
        };
        if self.values[id.index()] == value {
            return false;
        }

        self.values[id.index()] = value;
        self.notify(id, value);
        true
    }

    /// Applies every remote change queued so far, without blocking.
    ///
    /// Returns the number of events processed.
    pub fn dispatch_pending(&mut self) -> usize {
        let pending: Vec<RemoteChange> = self.remote.changes().try_iter().collect();
        for change in &pending {
            self.on_remote_change(&change.key, &change.value);
        }
        pending.len()
    }

    /// Waits up to `timeout` for a remote change, then applies it and
    /// everything queued behind it.
    ///
    /// Returns the number of events processed, or `None` once the change
    /// stream has closed and no further events can arrive.
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> Option<usize> {
        match self.remote.changes().recv_timeout(timeout) {
            Ok(change) => {
                self.on_remote_change(&change.key, &change.value);
                Some(1 + self.dispatch_pending())
            }
            Err(RecvTimeoutError::Timeout) => Some(0),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("remote change stream closed");
                None
            }
        }
    }

    /// Queries the number of brightness levels from the service.
    ///
    /// This always round-trips; the value is not part of the cache.
    pub fn maximum_brightness(&mut self) -> SyncResult<i32> {
        self.stats.fetches += 1;
        let raw = self.transport.fetch(MAX_BRIGHTNESS_KEY, self.config.fetch_timeout)?;
        let value = SettingKind::Integer.decode(MAX_BRIGHTNESS_KEY, &raw)?;
        Ok(value.as_integer().unwrap_or_default())
    }

    fn notify(&mut self, id: SettingId, value: SettingValue) {
        self.stats.notifications += 1;
        debug!(setting = %id, %value, "changed");
        self.feed.emit(SettingChange { id, value });
    }
}

/// Fetches and decodes one key, retrying transient failures.
fn fetch_initial<T: ConfigTransport + ?Sized>(
    config: &EngineConfig,
    transport: &T,
    descriptor: &SettingDescriptor,
    stats: &mut SyncStats,
) -> SyncResult<SettingValue> {
    let retry = &config.retry;
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            thread::sleep(retry.delay_for_attempt(attempt));
        }
        stats.fetches += 1;
        match transport.fetch(descriptor.remote_key, config.fetch_timeout) {
            Ok(raw) => return descriptor.kind.decode(descriptor.remote_key, &raw),
            Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                warn!(key = descriptor.remote_key, attempt, error = %e, "fetch failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::service::display_defaults;
    use crate::setting::{DoubleTapMode, InhibitMode};
    use crate::transport::MockTransport;

    const BRIGHTNESS_KEY: &str = "/system/osso/dsm/display/display_brightness";

    fn seeded_transport() -> MockTransport {
        let transport = MockTransport::new();
        for (id, value) in display_defaults() {
            transport.set_value(lookup(id).remote_key, value.encode());
        }
        transport.set_value(MAX_BRIGHTNESS_KEY, 5);
        transport
    }

    fn fast_config() -> EngineConfig {
        EngineConfig::new()
            .with_fetch_timeout(Duration::from_millis(50))
            .with_retry(RetryConfig::new(3).with_initial_delay(Duration::from_millis(1)))
    }

    fn engine() -> (Arc<MockTransport>, SyncEngine<MockTransport>) {
        let transport = Arc::new(seeded_transport());
        let engine = SyncEngine::new(fast_config(), Arc::clone(&transport)).unwrap();
        (transport, engine)
    }

    #[test]
    fn initial_fetch_in_registry_order() {
        let (transport, engine) = engine();
        let expected: Vec<_> = REGISTRY.iter().map(|d| d.remote_key.to_string()).collect();
        assert_eq!(transport.fetches(), expected);
        assert_eq!(transport.subscriber_count(), 1);
        assert_eq!(engine.stats().fetches, REGISTRY.len() as u64);
    }

    #[test]
    fn initial_fetch_populates_every_setting() {
        let (_transport, engine) = engine();
        for (id, value) in display_defaults() {
            assert_eq!(engine.get(id), value);
        }
        assert_eq!(engine.snapshot().len(), SettingId::ALL.len());
    }

    #[test]
    fn brightness_scenario() {
        let transport = Arc::new(seeded_transport());
        transport.set_value(BRIGHTNESS_KEY, 5);
        let mut engine = SyncEngine::new(fast_config(), Arc::clone(&transport)).unwrap();
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(5));
        let rx = engine.subscribe();

        assert!(engine.set(SettingId::Brightness, SettingValue::Integer(8)));
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(8));
        assert_eq!(
            transport.pushes(),
            vec![(BRIGHTNESS_KEY.to_string(), Value::Int32(8))]
        );
        assert_eq!(rx.try_iter().count(), 1);

        assert!(!engine.set(SettingId::Brightness, SettingValue::Integer(8)));
        assert_eq!(transport.pushes().len(), 1);
        assert_eq!(rx.try_iter().count(), 0);

        transport.emit_change(BRIGHTNESS_KEY, 3);
        assert_eq!(engine.dispatch_pending(), 1);
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(3));
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![SettingChange {
                id: SettingId::Brightness,
                value: SettingValue::Integer(3)
            }]
        );

        transport.emit_change(BRIGHTNESS_KEY, 3);
        assert_eq!(engine.dispatch_pending(), 1);
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(engine.stats().notifications, 2);
    }

    #[test]
    fn echo_of_own_write_is_silent() {
        let (transport, mut engine) = engine();
        let rx = engine.subscribe();

        engine.set(SettingId::LowPowerModeEnabled, SettingValue::Boolean(true));
        transport.emit_change(lookup(SettingId::LowPowerModeEnabled).remote_key, true);
        engine.dispatch_pending();

        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn push_failure_keeps_optimistic_value() {
        let (transport, mut engine) = engine();
        transport.set_push_failure(true);
        let rx = engine.subscribe();

        assert!(engine.set(SettingId::DimTimeout, SettingValue::Integer(60)));
        assert_eq!(engine.get(SettingId::DimTimeout), SettingValue::Integer(60));
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(engine.stats().push_failures, 1);
    }

    #[test]
    fn wrong_kind_write_is_ignored() {
        let (transport, mut engine) = engine();
        assert!(!engine.set(SettingId::Brightness, SettingValue::Boolean(true)));
        assert!(transport.pushes().is_empty());
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(3));
    }

    #[test]
    fn enum_settings_travel_as_integers() {
        let (transport, mut engine) = engine();
        engine.set(
            SettingId::InhibitMode,
            SettingValue::Inhibit(InhibitMode::StayOnWithCharger),
        );
        engine.set(
            SettingId::DoubleTapMode,
            SettingValue::DoubleTap(DoubleTapMode::Disabled),
        );
        let pushed: Vec<_> = transport.pushes().into_iter().map(|(_, v)| v).collect();
        assert_eq!(pushed, vec![Value::Int32(1), Value::Int32(0)]);
    }

    #[test]
    fn unknown_remote_key_is_ignored() {
        let (_transport, mut engine) = engine();
        let before = engine.snapshot();
        let rx = engine.subscribe();

        assert!(!engine.on_remote_change("/system/osso/dsm/energymanagement/enable", &Value::Bool(true)));
        assert_eq!(engine.snapshot(), before);
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(engine.stats().ignored_events, 1);
    }

    #[test]
    fn decode_mismatch_keeps_cached_value() {
        let (_transport, mut engine) = engine();
        let rx = engine.subscribe();
        let key = lookup(SettingId::AmbientLightSensorEnabled).remote_key;

        assert!(!engine.on_remote_change(key, &Value::Int32(0)));
        assert_eq!(
            engine.get(SettingId::AmbientLightSensorEnabled),
            SettingValue::Boolean(true)
        );
        assert!(!engine.on_remote_change(
            lookup(SettingId::InhibitMode).remote_key,
            &Value::Int32(42)
        ));
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(engine.stats().decode_failures, 2);
    }

    #[test]
    fn initial_fetch_retries_transient_failures() {
        let transport = Arc::new(seeded_transport());
        transport.fail_next_fetches(2);
        let engine = SyncEngine::new(fast_config(), Arc::clone(&transport)).unwrap();
        assert_eq!(engine.stats().fetches, REGISTRY.len() as u64 + 2);
    }

    #[test]
    fn initial_fetch_gives_up_after_retries() {
        let transport = Arc::new(seeded_transport());
        transport.fail_next_fetches(3);
        let result = SyncEngine::new(fast_config(), Arc::clone(&transport));
        match result {
            Err(SyncError::InitialFetch { key, source }) => {
                assert_eq!(key, BRIGHTNESS_KEY);
                assert!(source.is_retryable());
            }
            _ => panic!("expected initial fetch failure"),
        }
        assert_eq!(transport.subscriber_count(), 0);
    }

    #[test]
    fn initial_fetch_rejects_wrong_kind() {
        let transport = Arc::new(seeded_transport());
        transport.set_value(lookup(SettingId::LidSensorEnabled).remote_key, 1);
        let result = SyncEngine::new(fast_config(), Arc::clone(&transport));
        assert!(matches!(
            result,
            Err(SyncError::InitialFetch { source, .. }) if matches!(*source, SyncError::Decode { .. })
        ));
    }

    #[test]
    fn missing_key_fails_construction() {
        let transport = Arc::new(MockTransport::new());
        let result = SyncEngine::new(fast_config(), transport);
        assert!(matches!(result, Err(SyncError::InitialFetch { .. })));
    }

    #[test]
    fn maximum_brightness_is_live() {
        let (transport, mut engine) = engine();
        assert_eq!(engine.maximum_brightness().unwrap(), 5);
        transport.set_value(MAX_BRIGHTNESS_KEY, 10);
        assert_eq!(engine.maximum_brightness().unwrap(), 10);
        assert_eq!(
            transport
                .fetches()
                .iter()
                .filter(|k| k.as_str() == MAX_BRIGHTNESS_KEY)
                .count(),
            2
        );
    }

    #[test]
    fn wait_and_dispatch_times_out_quietly() {
        let (transport, mut engine) = engine();
        assert_eq!(engine.wait_and_dispatch(Duration::from_millis(5)), Some(0));
        transport.emit_change(BRIGHTNESS_KEY, 1);
        transport.emit_change(BRIGHTNESS_KEY, 2);
        assert_eq!(engine.wait_and_dispatch(Duration::from_millis(5)), Some(2));
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(2));
    }

    #[test]
    fn closed_stream_is_distinct_from_timeout() {
        let (transport, mut engine) = engine();
        transport.emit_change(BRIGHTNESS_KEY, 1);
        transport.close_streams();

        assert_eq!(engine.wait_and_dispatch(Duration::from_millis(5)), Some(1));
        assert_eq!(engine.wait_and_dispatch(Duration::from_millis(5)), None);
        assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(1));
    }

    #[test]
    fn dropping_engine_releases_subscription() {
        let (transport, engine) = engine();
        assert_eq!(transport.subscriber_count(), 1);
        drop(engine);
        assert_eq!(transport.subscriber_count(), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// A notification fires exactly when the cached value changes,
            /// for any interleaving of local and remote updates.
            #[test]
            fn notifications_track_real_changes(
                ops in proptest::collection::vec((any::<bool>(), 0i32..4), 1..40)
            ) {
                let (transport, mut engine) = engine();
                let rx = engine.subscribe();
                let mut expected = 0usize;

                for (local, level) in ops {
                    let before = engine.get(SettingId::Brightness);
                    if local {
                        engine.set(SettingId::Brightness, SettingValue::Integer(level));
                    } else {
                        transport.emit_change(BRIGHTNESS_KEY, level);
                        engine.dispatch_pending();
                    }
                    if before != SettingValue::Integer(level) {
                        expected += 1;
                    }
                    prop_assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(level));
                }

                prop_assert_eq!(rx.try_iter().count(), expected);
            }
        }
    }
}
