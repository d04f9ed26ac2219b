//! CBOR codec built on `ciborium`.

use crate::error::{CodecError, CodecResult};
use crate::WireCodec;
use serde_json::Value;

/// Binary wire codec.
///
/// Produces the same value trees as [`crate::JsonCodec`], so it can be
/// swapped in wherever the remote end accepts `application/cbor`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CborCodec;

impl WireCodec for CborCodec {
    fn content_type(&self) -> &'static str {
        "application/cbor"
    }

    fn serialize(&self, data: &Value) -> CodecResult<Vec<u8>> {
        let mut buffer = Vec::new();
        ciborium::ser::into_writer(data, &mut buffer)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buffer)
    }

    fn unserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        if bytes.is_empty() {
            return Err(CodecError::UnexpectedEof);
        }
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_header() {
        let bytes = CborCodec.serialize(&json!({"a": 1})).unwrap();
        // Major type 5 (map) with one pair
        assert_eq!(bytes[0], 0xa1);
    }

    #[test]
    fn empty_body_is_eof() {
        assert_eq!(CborCodec.unserialize(&[]), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn truncated_body_is_decoding_error() {
        let bytes = CborCodec.serialize(&json!({"title": "my title"})).unwrap();
        let err = CborCodec.unserialize(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
    }
}
