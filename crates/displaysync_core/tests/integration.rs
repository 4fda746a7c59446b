//! Integration tests for the sync engine over the loopback bus.

use displaysync_codec::Value;
use displaysync_core::{
    BusTransport, DisplaySettings, DoubleTapMode, EngineConfig, FileStore, InhibitMode,
    LoopbackBus, MemoryConfigService, MemoryStore, RetryConfig, SettingChange, SettingId,
    SettingValue, SyncEngine, SyncError,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Transport = BusTransport<LoopbackBus<MemoryConfigService>>;

const WAIT: Duration = Duration::from_secs(2);
const BRIGHTNESS_KEY: &str = "/system/osso/dsm/display/display_brightness";

fn config() -> EngineConfig {
    EngineConfig::new()
        .with_fetch_timeout(Duration::from_millis(100))
        .with_retry(RetryConfig::new(2).with_initial_delay(Duration::from_millis(1)))
}

fn connect(service: &Arc<MemoryConfigService>) -> (Arc<Transport>, SyncEngine<Transport>) {
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(service))));
    let engine = SyncEngine::new(config(), Arc::clone(&transport)).unwrap();
    (transport, engine)
}

#[test]
fn loads_service_state() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    service.insert(BRIGHTNESS_KEY, Value::Int32(5));
    let (_transport, engine) = connect(&service);

    assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(5));
    assert_eq!(
        engine.get(SettingId::DoubleTapMode),
        SettingValue::DoubleTap(DoubleTapMode::Enabled)
    );
    assert_eq!(service.calls_handled(), 11);
}

#[test]
fn local_write_reaches_service() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_transport, mut engine) = connect(&service);

    assert!(engine.set(
        SettingId::InhibitMode,
        SettingValue::Inhibit(InhibitMode::StayOn)
    ));
    assert_eq!(
        service.value("/system/osso/dsm/display/inhibit_blank_mode"),
        Some(Value::Int32(3))
    );
}

#[test]
fn echo_of_local_write_is_silent() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_transport, mut engine) = connect(&service);
    let rx = engine.subscribe();

    engine.set(SettingId::Brightness, SettingValue::Integer(7));
    assert_eq!(engine.wait_and_dispatch(WAIT), Some(1));

    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![SettingChange {
            id: SettingId::Brightness,
            value: SettingValue::Integer(7)
        }]
    );
}

#[test]
fn change_by_another_client_is_applied() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_transport, mut engine) = connect(&service);
    let rx = engine.subscribe();

    assert!(service.update(
        "/system/osso/dsm/locks/lid_sensor_enabled",
        Value::Bool(false)
    ));
    assert_eq!(engine.wait_and_dispatch(WAIT), Some(1));

    assert_eq!(
        engine.get(SettingId::LidSensorEnabled),
        SettingValue::Boolean(false)
    );
    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn two_engines_converge() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_a_transport, mut a) = connect(&service);
    let (_b_transport, mut b) = connect(&service);
    let b_changes = b.subscribe();

    a.set(SettingId::DimTimeout, SettingValue::Integer(120));
    assert_eq!(b.wait_and_dispatch(WAIT), Some(1));

    assert_eq!(b.get(SettingId::DimTimeout), SettingValue::Integer(120));
    assert_eq!(b_changes.try_iter().count(), 1);
    a.wait_and_dispatch(WAIT);
    assert_eq!(a.stats().notifications, 1);
}

#[test]
fn untracked_broadcast_is_ignored() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_transport, mut engine) = connect(&service);
    let before = engine.snapshot();
    let rx = engine.subscribe();

    service.update("/system/osso/dsm/energymanagement/enable_power_saving", Value::Bool(true));
    assert_eq!(engine.wait_and_dispatch(WAIT), Some(1));

    assert_eq!(engine.snapshot(), before);
    assert_eq!(rx.try_iter().count(), 0);
    assert_eq!(engine.stats().ignored_events, 1);
}

#[test]
fn dropped_engines_stop_their_forwarders() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));

    for _ in 0..10 {
        let engine = SyncEngine::new(config(), Arc::clone(&transport)).unwrap();
        drop(engine);
    }

    // Nothing is broadcast while waiting
    let deadline = Instant::now() + Duration::from_secs(5);
    while transport.active_forwarders() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(transport.active_forwarders(), 0);
}

#[test]
fn live_engine_keeps_its_forwarder() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (transport, mut engine) = connect(&service);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(transport.active_forwarders(), 1);

    service.update(BRIGHTNESS_KEY, Value::Int32(2));
    assert_eq!(engine.wait_and_dispatch(WAIT), Some(1));
    assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(2));
}

#[test]
fn unavailable_service_fails_construction() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    service.set_available(false);
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));

    match SyncEngine::new(config(), transport) {
        Err(SyncError::InitialFetch { key, source }) => {
            assert_eq!(key, BRIGHTNESS_KEY);
            assert!(matches!(*source, SyncError::Timeout));
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("engine built without a service"),
    }
}

#[test]
fn missing_key_fails_construction() {
    let service = Arc::new(MemoryConfigService::new());
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));

    let err = SyncEngine::new(config(), transport).err().unwrap();
    match err {
        SyncError::InitialFetch { source, .. } => {
            assert!(matches!(*source, SyncError::Service { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn closed_transport_keeps_optimistic_value() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (transport, mut engine) = connect(&service);
    transport.close();

    assert!(engine.set(SettingId::Brightness, SettingValue::Integer(1)));
    assert_eq!(engine.get(SettingId::Brightness), SettingValue::Integer(1));
    assert_eq!(service.value(BRIGHTNESS_KEY), Some(Value::Int32(3)));
    assert_eq!(engine.stats().push_failures, 1);
    assert!(engine.maximum_brightness().is_err());
}

#[test]
fn maximum_brightness_round_trips() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let (_transport, mut engine) = connect(&service);
    let calls = service.calls_handled();

    assert_eq!(engine.maximum_brightness().unwrap(), 5);
    assert_eq!(service.calls_handled(), calls + 1);
}

#[test]
fn facade_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.cbor");
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));

    {
        let settings =
            DisplaySettings::connect(config(), Arc::clone(&transport), FileStore::open(&path).unwrap())
                .unwrap();
        assert_eq!(settings.orientation_lock(), Value::from("dynamic"));
        assert!(settings.set_orientation_lock("landscape"));
    }

    let settings =
        DisplaySettings::connect(config(), transport, FileStore::open(&path).unwrap()).unwrap();
    assert_eq!(settings.orientation_lock(), Value::from("landscape"));
}

#[test]
fn facade_dispatches_remote_changes() {
    let service = Arc::new(MemoryConfigService::with_display_defaults());
    let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));
    let mut settings = DisplaySettings::connect(config(), transport, MemoryStore::new()).unwrap();

    service.update(
        "/system/osso/dsm/display/use_low_power_mode",
        Value::Bool(true),
    );
    assert_eq!(settings.engine_mut().wait_and_dispatch(WAIT), Some(1));
    assert!(settings.low_power_mode_enabled());
}
