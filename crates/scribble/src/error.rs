//! Unified error type for the Scribble server.

use scribble_protocol::ProtocolError;
use scribble_room::RegistryError;
use scribble_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Join rejections are not in here: they are answered on the wire and
/// never leave the registry as errors.
#[derive(Debug, thiserror::Error)]
pub enum ScribbleError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room registry has stopped.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
