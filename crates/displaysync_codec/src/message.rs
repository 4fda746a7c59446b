//! Bus message frames.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A method invocation addressed to a service object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Well-known bus name of the target service.
    pub destination: String,
    /// Object path inside the service.
    pub path: String,
    /// Interface the member belongs to.
    pub interface: String,
    /// Method name.
    pub member: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl MethodCall {
    /// Creates a method call with no arguments.
    pub fn new(
        destination: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.into(),
            path: path.into(),
            interface: interface.into(),
            member: member.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// A broadcast emitted by a service object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Object path of the emitter.
    pub path: String,
    /// Interface the signal belongs to.
    pub interface: String,
    /// Signal name.
    pub member: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

/// A framed bus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Method invocation.
    Call(MethodCall),
    /// Successful method return.
    Reply {
        /// Returned values.
        args: Vec<Value>,
    },
    /// Failed method return.
    Error {
        /// Error name, e.g. `org.freedesktop.DBus.Error.UnknownMethod`.
        name: String,
        /// Human-readable detail.
        message: String,
    },
    /// Broadcast.
    Signal(Signal),
}

impl Message {
    /// Creates a reply carrying a single value.
    pub fn reply(value: Value) -> Self {
        Message::Reply { args: vec![value] }
    }

    /// Creates an empty reply.
    pub fn empty_reply() -> Self {
        Message::Reply { args: Vec::new() }
    }

    /// Creates an error reply.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Message::Error {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Short name of the frame type, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Call(_) => "method call",
            Message::Reply { .. } => "reply",
            Message::Error { .. } => "error",
            Message::Signal(_) => "signal",
        }
    }

    /// Encodes the frame to CBOR bytes.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a frame from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }

    /// Consumes a reply frame and returns its first value.
    ///
    /// Error frames and any other frame type are reported as
    /// [`CodecError::UnexpectedMessage`].
    pub fn into_reply_value(self) -> CodecResult<Value> {
        match self {
            Message::Reply { args } => args
                .into_iter()
                .next()
                .ok_or_else(|| CodecError::unexpected("reply value", "empty reply")),
            Message::Error { name, message } => {
                Err(CodecError::unexpected("reply", format!("{name}: {message}")))
            }
            other => Err(CodecError::unexpected("reply", other.kind())),
        }
    }
}
