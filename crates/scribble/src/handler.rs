//! Per-connection handler: registration, inbound decoding, outbound
//! writing.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register an outbound channel with the room registry
//!   2. Spawn a writer that encodes registry events onto the socket
//!   3. Loop: receive frames → decode → dispatch to the registry
//!   4. On exit, report the disconnect exactly once

use std::sync::Arc;

use scribble_protocol::{ClientEvent, Codec, ConnectionId};
use scribble_room::ConnectionOutbound;
use scribble_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::ScribbleError;

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs even if the handler returns early with an error. `Drop` is
/// synchronous, so the registry call goes out on a fire-and-forget task.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let _ = state.registry.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ScribbleError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "client connected");

    let (tx, rx) = mpsc::unbounded_channel();
    state.registry.connect(conn_id, tx).await?;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let mut writer = tokio::spawn(write_outbound(
        Arc::clone(&conn),
        rx,
        state.codec.clone(),
    ));

    loop {
        let data = tokio::select! {
            received = conn.recv() => match received {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(%conn_id, "client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            // The registry closed us (rejected join) or went away.
            _ = &mut writer => {
                tracing::debug!(%conn_id, "closed by server");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode event");
                continue;
            }
        };

        state.registry.dispatch(conn_id, event).await?;
    }

    writer.abort();
    // _guard drops here → registry disconnect fires.
    Ok(())
}

/// Writes everything the registry sends for this connection.
///
/// Ends on an explicit close, when the registry drops the channel, or on
/// the first failed send. The socket is closed in every case.
async fn write_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<ConnectionOutbound>,
    codec: C,
) {
    let conn_id = conn.id();

    while let Some(msg) = outbound.recv().await {
        let event = match msg {
            ConnectionOutbound::Event(event) => event,
            ConnectionOutbound::Close => break,
        };

        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed");
            return;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after shutdown");
    }
}
