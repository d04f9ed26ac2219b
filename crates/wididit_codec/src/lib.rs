//! # Wididit Codec
//!
//! The serialization pair used on the wire between a Wididit client and a
//! Wididit server.
//!
//! Every payload exchanged with a server is a plain tree of mappings,
//! sequences, strings, numbers, booleans and nulls, represented here as a
//! [`Value`]. Components never build wire text by hand: they go through a
//! [`WireCodec`], which owns both directions of the conversion.
//!
//! ## Available Codecs
//!
//! - [`JsonCodec`] - The default, what Wididit servers speak
//! - [`CborCodec`] - Binary alternative for servers and test doubles that accept it
//!
//! ## Usage
//!
//! ```
//! use wididit_codec::{json, JsonCodec, WireCodec};
//!
//! let codec = JsonCodec;
//! let bytes = codec.serialize(&json!({"username": "tester"})).unwrap();
//! let value = codec.unserialize(&bytes).unwrap();
//! assert_eq!(value["username"], "tester");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;
pub use serde_json::{json, Map, Value};

/// A fixed pair of conversions between wire bytes and [`Value`] trees.
///
/// Implementations must be inverse of each other for every value they
/// accept: `unserialize(serialize(v)) == v`.
pub trait WireCodec: Send + Sync {
    /// MIME type sent in the `Content-Type` header of request bodies.
    fn content_type(&self) -> &'static str;

    /// Serializes data to be sent to the server.
    fn serialize(&self, data: &Value) -> CodecResult<Vec<u8>>;

    /// Unserializes data received from the server.
    fn unserialize(&self, bytes: &[u8]) -> CodecResult<Value>;
}

impl<C: WireCodec + ?Sized> WireCodec for Box<C> {
    fn content_type(&self) -> &'static str {
        (**self).content_type()
    }

    fn serialize(&self, data: &Value) -> CodecResult<Vec<u8>> {
        (**self).serialize(data)
    }

    fn unserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        (**self).unserialize(bytes)
    }
}
