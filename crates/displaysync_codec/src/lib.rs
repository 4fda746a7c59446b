//! # displaysync codec
//!
//! Bus scalar values and message framing for displaysync.
//!
//! This crate provides:
//! - [`Value`], the dynamically-typed scalar carried in bus messages
//! - [`Message`] frames (method call, reply, error, signal)
//! - CBOR encoding/decoding of frames
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Usage
//!
//! ```
//! use displaysync_codec::{Message, Value};
//!
//! let frame = Message::reply(Value::Int32(42));
//! let bytes = frame.encode().unwrap();
//! assert_eq!(Message::decode(&bytes).unwrap(), frame);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod message;
mod value;

pub use error::{CodecError, CodecResult};
pub use message::{Message, MethodCall, Signal};
pub use value::{decode_values, encode_values, Value};
