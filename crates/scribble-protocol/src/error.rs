//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name, or
    /// a payload of the wrong shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
