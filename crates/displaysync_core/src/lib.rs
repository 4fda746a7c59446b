//! # displaysync core
//!
//! Cache and change-notification proxy for the display settings held by
//! the MCE configuration service.
//!
//! This crate provides:
//! - The key registry mapping each setting to its remote key and kind
//! - [`SyncEngine`], the synchronous local cache with change detection
//! - A transport abstraction with a bus-backed implementation and a mock
//! - An in-process configuration service for tests and offline use
//! - Local store for settings the service does not own (orientation lock)
//! - [`DisplaySettings`], a typed facade over all of the above
//!
//! ## Model
//!
//! The engine loads every registered key once at construction and then
//! serves reads from memory. Writes update the cache, are sent to the
//! service without awaiting a reply, and notify subscribers. Changes made
//! elsewhere arrive as broadcasts and are applied when the owner dispatches
//! them. Subscribers hear about a setting only when its value actually
//! changes.
//!
//! ## Key Invariants
//!
//! - Every registered setting holds a value of its declared kind
//! - No notification without a change, no change without a notification
//! - The engine's own writes echoed back by the service are silent
//! - Broadcasts for keys outside the registry are ignored
//!
//! ## Usage
//!
//! ```
//! use displaysync_core::{
//!     BusTransport, DisplaySettings, EngineConfig, LoopbackBus, MemoryConfigService, MemoryStore,
//! };
//! use std::sync::Arc;
//!
//! let service = Arc::new(MemoryConfigService::with_display_defaults());
//! let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));
//! let mut settings =
//!     DisplaySettings::connect(EngineConfig::default(), transport, MemoryStore::new()).unwrap();
//!
//! assert!(settings.set_brightness(4));
//! assert_eq!(settings.brightness(), 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod change_feed;
mod config;
mod display;
mod engine;
mod error;
mod local_store;
mod property;
mod registry;
mod service;
mod setting;
mod transport;

pub use bus::{
    config_change_signal, decode_config_change, BusConnection, BusTransport, CallError,
    LoopbackBus, LoopbackService, CONFIG_CHANGE_SIG, GET_CONFIG, MCE_REQUEST_IF, MCE_REQUEST_PATH,
    MCE_SERVICE, MCE_SIGNAL_IF, MCE_SIGNAL_PATH, SET_CONFIG,
};
pub use change_feed::ChangeFeed;
pub use config::{EngineConfig, RetryConfig, DEFAULT_FETCH_TIMEOUT};
pub use display::DisplaySettings;
pub use engine::{SettingChange, SyncEngine, SyncStats};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use local_store::{FileStore, KeyValueStore, LocalKey, LocalSettings, MemoryStore};
pub use property::PropertySource;
pub use registry::{
    lookup, reverse_lookup, EnumType, SettingDescriptor, SettingId, SettingKind,
    MAX_BRIGHTNESS_KEY, REGISTRY,
};
pub use service::{
    display_defaults, MemoryConfigService, CONFIG_ERROR, INVALID_ARGS_ERROR, UNKNOWN_METHOD_ERROR,
};
pub use setting::{DoubleTapMode, InhibitMode, SettingValue};
pub use transport::{
    ConfigTransport, MockTransport, RemoteChange, Subscription, SubscriptionToken,
};
