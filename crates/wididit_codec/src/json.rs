//! JSON codec, the format Wididit servers expose under `/api/json`.

use crate::error::{CodecError, CodecResult};
use crate::WireCodec;
use serde_json::Value;

/// The default wire codec.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize(&self, data: &Value) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    fn unserialize(&self, bytes: &[u8]) -> CodecResult<Value> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn serialize_is_compact() {
        let bytes = JsonCodec.serialize(&json!({"password": "foo"})).unwrap();
        assert_eq!(bytes, br#"{"password":"foo"}"#);
    }

    #[test]
    fn bare_number_body() {
        // Entry creation replies with the new id as the whole body.
        assert_eq!(JsonCodec.unserialize(b"1").unwrap(), json!(1));
        assert_eq!(JsonCodec.unserialize(b" 42\n").unwrap(), json!(42));
    }

    #[test]
    fn empty_body_is_eof() {
        assert_eq!(JsonCodec.unserialize(b""), Err(CodecError::UnexpectedEof));
        assert_eq!(JsonCodec.unserialize(b"  \n"), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn garbage_is_decoding_error() {
        let err = JsonCodec.unserialize(b"<html>502</html>").unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
    }

    proptest! {
        #[test]
        fn arbitrary_strings_survive(text in ".*") {
            let value = json!({ "content": text });
            let bytes = JsonCodec.serialize(&value).unwrap();
            prop_assert_eq!(JsonCodec.unserialize(&bytes).unwrap(), value);
        }
    }
}
