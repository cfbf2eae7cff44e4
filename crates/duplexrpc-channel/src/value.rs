//! Value encoding.
//!
//! Channels carry bytes; what a value looks like on the wire is decided by a
//! [`ValueCodec`]. Anything that implements serde's `Serialize` /
//! `DeserializeOwned` can be sent, provided the codec can represent it.

use serde::de::DeserializeOwned;
use serde::Serialize;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a [`ValueCodec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode value: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode value: {0}")]
    Decode(#[source] BoxError),
}

/// Turns values into message payloads and back.
///
/// Implementations must round-trip every value their value model can
/// represent: `decode(encode(v)) == v`.
pub trait ValueCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|err| CodecError::Encode(Box::new(err)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError::Decode(Box::new(err)))
    }
}
