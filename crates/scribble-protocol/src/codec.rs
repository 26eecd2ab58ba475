//! Codec trait and the JSON implementation.
//!
//! A codec turns events into frame bytes and back. The server is generic
//! over [`Codec`] so the connection handler never names a concrete format.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to frame bytes and decodes them back.
///
/// `Clone` because every connection's writer task carries its own copy.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Serializes a value into frame bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes frame bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON text, which is what browser clients send.
///
/// ```rust
/// use scribble_protocol::{Codec, JsonCodec, Seconds, ServerEvent, TimerStart};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ServerEvent::TimerStart(TimerStart { duration: Seconds::from(60) })).unwrap();
/// assert_eq!(bytes, br#"{"event":"timerStart","data":{"duration":60}}"#);
///
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ServerEvent::TimerStart(TimerStart { duration: Seconds::from(60) }));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
