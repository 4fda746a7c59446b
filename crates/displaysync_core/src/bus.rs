//! Message-bus transport for the MCE configuration interface.
//!
//! The bus connection itself is abstracted via [`BusConnection`] so the
//! same transport works over a real system-bus binding or over the
//! in-process [`LoopbackBus`]. Frames are encoded with
//! `displaysync_codec`.

use crate::error::{SyncError, SyncResult};
use crate::transport::{ConfigTransport, RemoteChange, Subscription};
use displaysync_codec::{Message, MethodCall, Signal, Value};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Well-known bus name of the MCE service.
pub const MCE_SERVICE: &str = "com.nokia.mce";
/// Object path for MCE requests.
pub const MCE_REQUEST_PATH: &str = "/com/nokia/mce/request";
/// Interface for MCE requests.
pub const MCE_REQUEST_IF: &str = "com.nokia.mce.request";
/// Object path MCE emits signals from.
pub const MCE_SIGNAL_PATH: &str = "/com/nokia/mce/signal";
/// Interface of MCE signals.
pub const MCE_SIGNAL_IF: &str = "com.nokia.mce.signal";
/// Method reading a configuration value.
pub const GET_CONFIG: &str = "get_config";
/// Method writing a configuration value.
pub const SET_CONFIG: &str = "set_config";
/// Signal broadcast when a configuration value changes.
pub const CONFIG_CHANGE_SIG: &str = "config_change_ind";

/// How often a signal forwarder checks whether its subscription was dropped.
const FORWARDER_POLL: Duration = Duration::from_millis(50);

/// Failure of a blocking bus call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No reply arrived in time.
    Timeout,
    /// The call could not be delivered.
    Failed(String),
}

/// Byte-level bus connection.
///
/// Implement this trait to bind the transport to an actual bus library.
pub trait BusConnection: Send + Sync {
    /// Sends an encoded method call and waits for the encoded reply.
    fn call(&self, message: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, CallError>;

    /// Sends an encoded method call without waiting for a reply.
    fn send(&self, message: Vec<u8>) -> Result<(), String>;

    /// Returns a stream of encoded signals.
    fn signals(&self) -> Result<Receiver<Vec<u8>>, String>;

    /// Checks if the connection is usable.
    fn is_healthy(&self) -> bool;
}

/// [`ConfigTransport`] speaking the MCE request/signal interface.
pub struct BusTransport<C: BusConnection> {
    connection: Arc<C>,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
    forwarders: Arc<AtomicUsize>,
}

impl<C: BusConnection> BusTransport<C> {
    /// Creates a transport over a connection.
    pub fn new(connection: C) -> Self {
        Self {
            connection: Arc::new(connection),
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
            forwarders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Checks if the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.connection.is_healthy()
    }

    /// Number of signal forwarder threads still running.
    ///
    /// A forwarder exits shortly after its [`Subscription`] is dropped.
    pub fn active_forwarders(&self) -> usize {
        self.forwarders.load(Ordering::SeqCst)
    }

    /// Closes the transport. Subsequent operations fail with `NotConnected`.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn request(member: &str, key: &str) -> MethodCall {
        MethodCall::new(MCE_SERVICE, MCE_REQUEST_PATH, MCE_REQUEST_IF, member)
            .arg(Value::ObjectPath(key.to_string()))
    }
}

impl<C: BusConnection> ConfigTransport for BusTransport<C> {
    fn fetch(&self, key: &str, timeout: Duration) -> SyncResult<Value> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        debug!(key, "get_config");
        let body = Message::Call(Self::request(GET_CONFIG, key)).encode()?;
        let reply = self.connection.call(body, timeout).map_err(|e| match e {
            CallError::Timeout => {
                self.set_error("get_config timed out");
                SyncError::Timeout
            }
            CallError::Failed(msg) => {
                self.set_error(&msg);
                SyncError::transport_retryable(msg)
            }
        })?;

        match Message::decode(&reply)? {
            Message::Error { name, message } => Err(SyncError::Service { name, message }),
            other => Ok(other.into_reply_value()?),
        }
    }

    fn push(&self, key: &str, value: Value) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        debug!(key, %value, "set_config");
        let body = Message::Call(Self::request(SET_CONFIG, key).arg(value)).encode()?;
        self.connection.send(body).map_err(|e| {
            self.set_error(&e);
            SyncError::transport_fatal(e)
        })
    }

    fn subscribe(&self) -> SyncResult<Subscription> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let raw = self
            .connection
            .signals()
            .map_err(SyncError::transport_retryable)?;
        let (tx, rx) = mpsc::channel();
        let subscription = Subscription::new(rx);
        let token = subscription.token();
        let forwarders = Arc::clone(&self.forwarders);

        forwarders.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("mce-config-signals".into())
            .spawn(move || {
                while token.is_active() {
                    match raw.recv_timeout(FORWARDER_POLL) {
                        Ok(bytes) => {
                            let Some(change) = decode_config_change(&bytes) else {
                                continue;
                            };
                            if tx.send(change).is_err() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                forwarders.fetch_sub(1, Ordering::SeqCst);
                debug!("config change forwarder stopped");
            });
        if let Err(e) = spawned {
            self.forwarders.fetch_sub(1, Ordering::SeqCst);
            return Err(SyncError::transport_fatal(e.to_string()));
        }

        Ok(subscription)
    }
}

/// Extracts a configuration change from an encoded signal.
///
/// Signals from other objects or with a foreign shape yield `None`.
pub fn decode_config_change(bytes: &[u8]) -> Option<RemoteChange> {
    let signal = match Message::decode(bytes) {
        Ok(Message::Signal(signal)) => signal,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "dropping undecodable signal");
            return None;
        }
    };
    if signal.path != MCE_SIGNAL_PATH
        || signal.interface != MCE_SIGNAL_IF
        || signal.member != CONFIG_CHANGE_SIG
    {
        return None;
    }
    let mut args = signal.args.into_iter();
    match (args.next(), args.next()) {
        (Some(Value::Text(key) | Value::ObjectPath(key)), Some(value)) => {
            Some(RemoteChange { key, value })
        }
        _ => {
            warn!("malformed config change signal");
            None
        }
    }
}

/// Builds the signal a service emits when `key` changes.
pub fn config_change_signal(key: &str, value: Value) -> Message {
    Message::Signal(Signal {
        path: MCE_SIGNAL_PATH.into(),
        interface: MCE_SIGNAL_IF.into(),
        member: CONFIG_CHANGE_SIG.into(),
        args: vec![Value::Text(key.to_string()), value],
    })
}

/// A service reachable through a [`LoopbackBus`].
pub trait LoopbackService: Send + Sync {
    /// Handles a method call. `None` means the service never answers.
    fn handle_call(&self, call: &MethodCall) -> Option<Message>;

    /// Returns a stream of the service's encoded signals.
    fn subscribe_signals(&self) -> Receiver<Vec<u8>>;
}

/// An in-process bus that routes frames directly to a service.
///
/// Useful for tests and offline tooling.
pub struct LoopbackBus<S: LoopbackService> {
    service: Arc<S>,
    healthy: AtomicBool,
}

impl<S: LoopbackService> LoopbackBus<S> {
    /// Creates a loopback bus connected to the given service.
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            healthy: AtomicBool::new(true),
        }
    }

    /// Sets the health state of the connection.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn dispatch(&self, message: &[u8]) -> Result<Option<Message>, String> {
        if !self.is_healthy() {
            return Err("bus connection lost".into());
        }
        match Message::decode(message).map_err(|e| e.to_string())? {
            Message::Call(call) => Ok(self.service.handle_call(&call)),
            other => Err(format!("cannot route {}", other.kind())),
        }
    }
}

impl<S: LoopbackService> BusConnection for LoopbackBus<S> {
    fn call(&self, message: Vec<u8>, _timeout: Duration) -> Result<Vec<u8>, CallError> {
        match self.dispatch(&message).map_err(CallError::Failed)? {
            Some(reply) => reply.encode().map_err(|e| CallError::Failed(e.to_string())),
            None => Err(CallError::Timeout),
        }
    }

    fn send(&self, message: Vec<u8>) -> Result<(), String> {
        self.dispatch(&message).map(|_| ())
    }

    fn signals(&self) -> Result<Receiver<Vec<u8>>, String> {
        if !self.is_healthy() {
            return Err("bus connection lost".into());
        }
        Ok(self.service.subscribe_signals())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
