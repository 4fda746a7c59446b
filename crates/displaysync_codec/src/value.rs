//! Dynamically-typed bus scalar.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar as carried in a bus message.
///
/// The configuration service answers with variants, so the receiving side
/// never knows the concrete type up front. Consumers decode a `Value`
/// against the kind they expect and treat anything else as a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// UTF-8 string.
    Text(String),
    /// Object path (used to address configuration keys).
    ObjectPath(String),
}

impl Value {
    /// Returns the boolean if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `i32` if it is an integer that fits.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            Value::UInt32(n) => i32::try_from(*n).ok(),
            Value::Int64(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the string content of a `Text` or `ObjectPath`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::ObjectPath(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the carried type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::Text(_) => "string",
            Value::ObjectPath(_) => "object path",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::UInt32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::ObjectPath(p) => write!(f, "{p}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Encodes a keyed set of values to CBOR, for on-disk stores.
pub fn encode_values(values: &BTreeMap<String, Value>) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(values, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a keyed set of values written by [`encode_values`].
pub fn decode_values(bytes: &[u8]) -> CodecResult<BTreeMap<String, Value>> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}
