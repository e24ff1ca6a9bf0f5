//! JSON serialization glued to a [`Codec`].

use crate::codec::Codec;
use crate::error::{CodecError, CodecResult};
use serde_json::Value;

/// Serializes `value` as JSON and runs it through `codec`.
///
/// # Errors
///
/// Fails if serialization or encoding fails, or if the encoded bytes are
/// not valid UTF-8 (text columns cannot hold them).
pub fn encode_value(value: &Value, codec: &Codec) -> CodecResult<String> {
    let json = serde_json::to_vec(value).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    let encoded = codec.encode(&json)?;
    String::from_utf8(encoded).map_err(|_| CodecError::InvalidUtf8)
}

/// Inverse of [`encode_value`].
///
/// # Errors
///
/// Fails if the codec rejects the payload or the decoded bytes are not
/// valid JSON.
pub fn decode_value(payload: &str, codec: &Codec) -> CodecResult<Value> {
    let json = codec.decode(payload.as_bytes())?;
    serde_json::from_slice(&json).map_err(|e| CodecError::decoding_failed(e.to_string()))
}
