//! Error types for the settings cache.

use displaysync_codec::CodecError;
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for local key-value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the configuration service.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Bus or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The service answered with an error reply.
    #[error("service error {name}: {message}")]
    Service {
        /// Error name reported by the service.
        name: String,
        /// Error detail.
        message: String,
    },

    /// No reply within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// Not connected to the bus.
    #[error("not connected to the message bus")]
    NotConnected,

    /// A value did not match the kind declared for its key.
    #[error("cannot decode {key}: expected {expected}, got {found}")]
    Decode {
        /// Remote key the value belongs to.
        key: String,
        /// Declared kind.
        expected: &'static str,
        /// What actually arrived.
        found: String,
    },

    /// Frame encoding/decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A key could not be fetched while populating the cache.
    #[error("initial fetch of {key} failed: {source}")]
    InitialFetch {
        /// Remote key that failed.
        key: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a decode mismatch error.
    pub fn decode(key: impl Into<String>, expected: &'static str, found: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            expected,
            found: found.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::NotConnected => true,
            _ => false,
        }
    }
}

/// Errors from the local key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store file could not be parsed.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("bus hiccup").is_retryable());
        assert!(!SyncError::transport_fatal("access denied").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::NotConnected.is_retryable());
        assert!(!SyncError::decode("/k", "bool", "int32").is_retryable());
        assert!(!SyncError::Service {
            name: "com.nokia.mce.GConf.Error".into(),
            message: "no such key".into()
        }
        .is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::decode("/system/osso/dsm/display/als_enabled", "bool", "int32");
        assert_eq!(
            err.to_string(),
            "cannot decode /system/osso/dsm/display/als_enabled: expected bool, got int32"
        );

        let err = SyncError::InitialFetch {
            key: "/a",
            source: Box::new(SyncError::Timeout),
        };
        assert_eq!(err.to_string(), "initial fetch of /a failed: operation timed out");
    }

    #[test]
    fn store_error_wraps_io() {
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = StoreError::from(io);
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
