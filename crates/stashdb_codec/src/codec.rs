//! Reversible payload transforms.

use crate::error::{CodecError, CodecResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// A caller-supplied transform over a serialized payload.
pub type CodecFn = Arc<dyn Fn(&[u8]) -> CodecResult<Vec<u8>> + Send + Sync>;

/// Transform applied to a serialized value before it is written and after
/// it is read back.
///
/// The framework treats a [`Codec::Custom`] pair opaquely: it never checks
/// that `decode` actually inverts `encode`.
///
/// # Example
///
/// ```
/// use stashdb_codec::Codec;
///
/// let codec = Codec::Compress;
/// let encoded = codec.encode(b"hello hello hello").unwrap();
/// assert_eq!(codec.decode(&encoded).unwrap(), b"hello hello hello");
/// ```
#[derive(Clone, Default)]
pub enum Codec {
    /// Bytes pass through unchanged.
    #[default]
    Identity,
    /// zlib compression followed by standard base64.
    Compress,
    /// A caller-supplied encode/decode pair.
    Custom {
        /// Applied before a payload is written.
        encode: CodecFn,
        /// Applied after a payload is read.
        decode: CodecFn,
    },
}

impl Codec {
    /// Builds a custom codec from two closures.
    pub fn custom<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&[u8]) -> CodecResult<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8]) -> CodecResult<Vec<u8>> + Send + Sync + 'static,
    {
        Self::Custom {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Short name used in logs and by the CLI.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Compress => "compress",
            Self::Custom { .. } => "custom",
        }
    }

    /// Encodes a serialized payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if compression fails, or
    /// whatever error a custom encoder reports.
    pub fn encode(&self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(bytes.to_vec()),
            Self::Compress => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(bytes)
                    .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
                Ok(STANDARD.encode(compressed).into_bytes())
            }
            Self::Custom { encode, .. } => encode(bytes),
        }
    }

    /// Decodes a stored payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if the payload is not valid
    /// base64 or not a valid zlib stream, or whatever error a custom decoder
    /// reports.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(bytes.to_vec()),
            Self::Compress => {
                let compressed = STANDARD
                    .decode(bytes)
                    .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
                let mut decoder = ZlibDecoder::new(&compressed[..]);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
                Ok(out)
            }
            Self::Custom { decode, .. } => decode(bytes),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Codec").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        let codec = Codec::Identity;
        assert_eq!(codec.encode(b"abc").unwrap(), b"abc");
        assert_eq!(codec.decode(b"abc").unwrap(), b"abc");
    }

    #[test]
    fn compress_produces_base64_text() {
        let codec = Codec::Compress;
        let encoded = codec.encode(br#"{"alice":10}"#).unwrap();
        assert!(encoded
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
        assert_eq!(codec.decode(&encoded).unwrap(), br#"{"alice":10}"#);
    }

    #[test]
    fn compress_shrinks_repetitive_input() {
        let input = vec![b'x'; 10_000];
        let encoded = Codec::Compress.encode(&input).unwrap();
        assert!(encoded.len() < input.len() / 10);
    }

    #[test]
    fn compress_rejects_garbage() {
        let result = Codec::Compress.decode(b"not base64 at all!");
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));

        // valid base64, invalid zlib
        let result = Codec::Compress.decode(b"aGVsbG8=");
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }

    #[test]
    fn custom_pair_is_applied() {
        let codec = Codec::custom(
            |bytes| Ok(bytes.iter().rev().copied().collect()),
            |bytes| Ok(bytes.iter().rev().copied().collect()),
        );
        let encoded = codec.encode(b"abc").unwrap();
        assert_eq!(encoded, b"cba");
        assert_eq!(codec.decode(&encoded).unwrap(), b"abc");
        assert_eq!(codec.name(), "custom");
    }

    #[test]
    fn custom_errors_propagate() {
        let codec = Codec::custom(
            |_| Err(CodecError::encoding_failed("nope")),
            |bytes| Ok(bytes.to_vec()),
        );
        assert!(codec.encode(b"abc").is_err());
    }

    #[test]
    fn debug_hides_closures() {
        let codec = Codec::custom(|b| Ok(b.to_vec()), |b| Ok(b.to_vec()));
        assert_eq!(format!("{codec:?}"), "Codec(\"custom\")");
    }
}
