//! Transport abstraction for the remote configuration service.

use crate::change_feed::ChangeFeed;
use crate::error::{SyncError, SyncResult};
use displaysync_codec::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// A change broadcast by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChange {
    /// Remote key that changed.
    pub key: String,
    /// New value, not yet decoded.
    pub value: Value,
}

impl RemoteChange {
    /// Creates a change event.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A live subscription to change broadcasts.
///
/// Dropping it releases the subscription: the producer observes this
/// through a [`SubscriptionToken`] and stops delivering.
pub struct Subscription {
    changes: Receiver<RemoteChange>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Wraps a change stream.
    pub fn new(changes: Receiver<RemoteChange>) -> Self {
        Self {
            changes,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Token the producing side polls to learn the subscription is gone.
    pub fn token(&self) -> SubscriptionToken {
        SubscriptionToken(Arc::clone(&self.active))
    }

    /// The change stream.
    pub fn changes(&self) -> &Receiver<RemoteChange> {
        &self.changes
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Producer-side view of a [`Subscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionToken(Arc<AtomicBool>);

impl SubscriptionToken {
    /// Returns false once the subscription has been dropped.
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Connection to the remote configuration service.
///
/// This trait abstracts the bus, allowing for different implementations
/// (a real bus connection, a loopback for tests and tooling, a mock).
pub trait ConfigTransport: Send + Sync {
    /// Fetches the current value of a key, blocking for at most `timeout`.
    fn fetch(&self, key: &str, timeout: Duration) -> SyncResult<Value>;

    /// Sends a new value for a key without waiting for any reply.
    ///
    /// An `Ok` only means the request left this process.
    fn push(&self, key: &str, value: Value) -> SyncResult<()>;

    /// Subscribes to change broadcasts.
    ///
    /// Dropping the returned [`Subscription`] releases it.
    fn subscribe(&self) -> SyncResult<Subscription>;
}

/// A scripted transport for testing.
#[derive(Default)]
pub struct MockTransport {
    values: Mutex<HashMap<String, Value>>,
    fetches: Mutex<Vec<String>>,
    pushes: Mutex<Vec<(String, Value)>>,
    feed: ChangeFeed<RemoteChange>,
    subscriptions: Mutex<Vec<SubscriptionToken>>,
    disconnected: AtomicBool,
    failing_fetches: AtomicU32,
    failing_pushes: AtomicBool,
}

impl MockTransport {
    /// Creates a mock with no values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value returned for `key`.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.lock().insert(key.into(), value.into());
    }

    /// Builder form of [`MockTransport::set_value`].
    pub fn with_value(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(key, value);
        self
    }

    /// Makes the next `count` fetches fail with a retryable error.
    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Makes every push fail.
    pub fn set_push_failure(&self, failing: bool) {
        self.failing_pushes.store(failing, Ordering::SeqCst);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Keys fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    /// Pushes received so far, in order (including failed ones).
    pub fn pushes(&self) -> Vec<(String, Value)> {
        self.pushes.lock().clone()
    }

    /// Number of subscriptions not yet dropped.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|token| token.is_active())
            .count()
    }

    /// Simulates the service closing every change stream.
    pub fn close_streams(&self) {
        self.feed.clear();
    }

    /// Simulates a broadcast from the service.
    pub fn emit_change(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.feed.emit(RemoteChange::new(key, value));
    }
}

impl ConfigTransport for MockTransport {
    fn fetch(&self, key: &str, _timeout: Duration) -> SyncResult<Value> {
        self.fetches.lock().push(key.to_string());
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        let failing = self
            .failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(SyncError::transport_retryable("scripted fetch failure"));
        }
        self.values
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| SyncError::Service {
                name: "com.nokia.mce.GConf.Error".into(),
                message: format!("no mock value for {key}"),
            })
    }

    fn push(&self, key: &str, value: Value) -> SyncResult<()> {
        self.pushes.lock().push((key.to_string(), value));
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        if self.failing_pushes.load(Ordering::SeqCst) {
            return Err(SyncError::transport_fatal("scripted push failure"));
        }
        Ok(())
    }

    fn subscribe(&self) -> SyncResult<Subscription> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        let subscription = Subscription::new(self.feed.subscribe());
        self.subscriptions.lock().push(subscription.token());
        Ok(subscription)
    }
}
