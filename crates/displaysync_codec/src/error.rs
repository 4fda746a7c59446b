//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a message.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode message bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A well-formed message of the wrong shape was received.
    #[error("unexpected message: expected {expected}, got {found}")]
    UnexpectedMessage {
        /// What the caller was waiting for.
        expected: &'static str,
        /// What actually arrived.
        found: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unexpected message error.
    pub fn unexpected(expected: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedMessage {
            expected,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::decoding_failed("truncated frame");
        assert_eq!(err.to_string(), "decoding failed: truncated frame");

        let err = CodecError::unexpected("reply", "signal");
        assert!(err.to_string().contains("expected reply"));
        assert!(err.to_string().contains("signal"));
    }
}
