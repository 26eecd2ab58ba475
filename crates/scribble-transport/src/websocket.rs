//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::{StatusCode, header::ORIGIN};

use crate::{
    Connection, ConnectionId, OriginPolicy, Transport, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a peer gets to finish the upgrade handshake once its TCP
/// connection is accepted.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    origins: OriginPolicy,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport that accepts any origin.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_origins(addr, OriginPolicy::allow_any()).await
    }

    /// Binds a new WebSocket transport that enforces `origins` on every
    /// upgrade request.
    pub async fn bind_with_origins(
        addr: &str,
        origins: OriginPolicy,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(
            addr,
            open = origins.is_open(),
            "WebSocket transport listening"
        );
        Ok(Self {
            listener,
            origins,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Overrides [`DEFAULT_HANDSHAKE_TIMEOUT`]. A peer that has not
    /// completed the upgrade by then is dropped and `accept` returns
    /// [`TransportError::HandshakeTimeout`].
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let mut rejected: Option<String> = None;
        let origins = &self.origins;
        let handshake = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| {
                let origin = req
                    .headers()
                    .get(ORIGIN)
                    .and_then(|v| v.to_str().ok());
                if origins.allows(origin) {
                    return Ok(resp);
                }
                rejected = origin.map(str::to_string);
                let mut err: ErrorResponse =
                    ErrorResponse::new(Some("origin not allowed".into()));
                *err.status_mut() = StatusCode::FORBIDDEN;
                Err(err)
            },
        );
        let upgrade = tokio::time::timeout(self.handshake_timeout, handshake).await;

        let ws = match upgrade {
            Ok(Ok(ws)) => ws,
            Err(_) => {
                tracing::debug!(
                    %addr,
                    timeout_ms = self.handshake_timeout.as_millis() as u64,
                    "WebSocket handshake timed out"
                );
                return Err(TransportError::HandshakeTimeout(addr));
            }
            Ok(Err(e)) => {
                if let Some(origin) = rejected {
                    tracing::debug!(%addr, %origin, "rejected upgrade from origin");
                    return Err(TransportError::OriginRejected(origin));
                }
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                )));
            }
        };

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer: addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single WebSocket connection.
///
/// The socket is split so the writer half can be driven from one task
/// while another task waits on the reader half.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Valid UTF-8 goes out as a text frame, anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
