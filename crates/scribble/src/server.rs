//! `ScribbleServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport, JSON codec, and the
//! room registry actor every connection talks to.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use scribble_protocol::{Codec, JsonCodec};
use scribble_room::{spawn_registry, RegistryHandle, RoomConfig};
use scribble_transport::{
    OriginPolicy, Transport, WebSocketTransport, DEFAULT_HANDSHAKE_TIMEOUT,
};

use crate::handler::handle_connection;
use crate::ScribbleError;

/// Address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RegistryHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Scribble server.
///
/// # Example
///
/// ```rust,no_run
/// use scribble::prelude::*;
///
/// # async fn run() -> Result<(), ScribbleError> {
/// let server = ScribbleServer::builder()
///     .bind("0.0.0.0:5000")
///     .max_players(12)
///     .allowed_origins(["https://scribble.example"])
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ScribbleServerBuilder<C: Codec = JsonCodec> {
    bind_addr: String,
    room_config: RoomConfig,
    origins: OriginPolicy,
    handshake_timeout: Duration,
    codec: C,
}

impl ScribbleServerBuilder<JsonCodec> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room_config: RoomConfig::default(),
            origins: OriginPolicy::allow_any(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            codec: JsonCodec,
        }
    }
}

impl Default for ScribbleServerBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> ScribbleServerBuilder<C> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the per-room player cap.
    pub fn max_players(mut self, max_players: usize) -> Self {
        self.room_config.max_players = max_players;
        self
    }

    /// Restricts which browser origins may open a socket.
    ///
    /// An empty list allows every origin.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.origins = OriginPolicy::allow_only(origins);
        self
    }

    /// How long a new peer gets to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Switches the wire codec.
    pub fn codec<C2: Codec>(self, codec: C2) -> ScribbleServerBuilder<C2> {
        ScribbleServerBuilder {
            bind_addr: self.bind_addr,
            room_config: self.room_config,
            origins: self.origins,
            handshake_timeout: self.handshake_timeout,
            codec,
        }
    }

    /// Binds the listener and starts the room registry.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<ScribbleServer<C>, ScribbleError> {
        let transport = WebSocketTransport::bind_with_origins(&self.bind_addr, self.origins)
            .await?
            .with_handshake_timeout(self.handshake_timeout);

        let state = Arc::new(ServerState {
            registry: spawn_registry(self.room_config),
            codec: self.codec,
        });

        Ok(ScribbleServer { transport, state })
    }
}

/// A bound Scribble server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct ScribbleServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ScribbleServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ScribbleServerBuilder<JsonCodec> {
        ScribbleServerBuilder::new()
    }
}

impl<C: Codec> ScribbleServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Handle to the room registry, for snapshot queries.
    pub fn registry(&self) -> RegistryHandle {
        self.state.registry.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ScribbleError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the
    /// registry. Every open connection is closed once the registry is
    /// gone.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ScribbleError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.local_addr().ok(), "scribble server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        if let Err(e) = self.state.registry.shutdown().await {
            tracing::debug!(error = %e, "registry already stopped");
        }
        Ok(())
    }
}
