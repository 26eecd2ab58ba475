use std::net::SocketAddr;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a connection (TCP accept or WebSocket upgrade) failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The upgrade request carried an `Origin` outside the allow-list.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// The peer did not finish the WebSocket upgrade in time.
    #[error("handshake timed out: {0}")]
    HandshakeTimeout(SocketAddr),
}
