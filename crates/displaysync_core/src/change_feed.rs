//! Channel-based change notification.
//!
//! A [`ChangeFeed`] fans each emitted event out to every live subscriber.
//! Subscribers are plain `mpsc` receivers; dropping one unsubscribes it and
//! the sender is pruned on the next emit.
//!
//! # Usage
//!
//! ```rust
//! use displaysync_core::ChangeFeed;
//!
//! let feed = ChangeFeed::new();
//! let receiver = feed.subscribe();
//! feed.emit(7u32);
//! assert_eq!(receiver.try_recv().unwrap(), 7);
//! ```

use parking_lot::RwLock;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

/// Distributes events to subscribers in emission order.
pub struct ChangeFeed<T> {
    subscribers: RwLock<Vec<Sender<T>>>,
}

impl<T: Clone> ChangeFeed<T> {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers, dropping disconnected ones.
    pub fn emit(&self, event: T) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Disconnects every subscriber.
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    /// Returns the number of registered subscribers.
    ///
    /// Dropped receivers are only noticed on the next emit.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<T: Clone> Default for ChangeFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ChangeFeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}
