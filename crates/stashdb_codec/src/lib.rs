//! # stashdb codec
//!
//! Byte-level transforms shared by every stashdb backend.
//!
//! This crate provides:
//! - [`Codec`] - a reversible transform applied to a serialized value before
//!   it is written and after it is read (identity, zlib + base64, or a
//!   caller-supplied pair of functions)
//! - [`KeyCodec`] - a fixed-width [`Fingerprint`] derived from a logical key
//! - [`Chunk`] splitting and reassembly for media with a per-field size limit
//! - [`encode_value`] / [`decode_value`] tying JSON serialization to a codec
//!
//! ## Usage
//!
//! ```
//! use stashdb_codec::{chunk, decode_value, encode_value, Codec, KeyCodec};
//! use serde_json::json;
//!
//! let codec = Codec::Compress;
//! let payload = encode_value(&json!({"alice": 10}), &codec).unwrap();
//!
//! let fingerprint = KeyCodec::fingerprint("scores");
//! let chunks = chunk::split(&fingerprint, &payload, 8);
//! let joined = chunk::reassemble(chunks).unwrap();
//!
//! assert_eq!(decode_value(&joined, &codec).unwrap(), json!({"alice": 10}));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chunk;
mod codec;
mod error;
mod key;
mod value;

pub use chunk::{Chunk, DEFAULT_MAX_CHUNK_LEN};
pub use codec::{Codec, CodecFn};
pub use error::{CodecError, CodecResult};
pub use key::{Fingerprint, KeyCodec, FINGERPRINT_LEN};
pub use value::{decode_value, encode_value};
