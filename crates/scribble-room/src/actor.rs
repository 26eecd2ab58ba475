//! Registry actor: the single task that owns the [`RoomRegistry`].
//!
//! Connection handlers never touch the registry directly. They send
//! commands through a [`RegistryHandle`]; the actor applies them one at a
//! time, interleaved with countdown expiries, and pushes the resulting
//! events into each connection's outbound channel before taking the next
//! command.

use std::collections::HashMap;

use scribble_protocol::{ClientEvent, ConnectionId, JoinRoom, ServerEvent, SetTimer};
use tokio::sync::{mpsc, oneshot};

use crate::registry::{Delivery, Expiry};
use crate::{RegistryError, RoomConfig, RoomRegistry, RoomSummary};

/// Default command channel size for the registry actor.
const DEFAULT_CHANNEL_SIZE: usize = 256;

/// What the actor hands to a connection's writer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutbound {
    /// Encode and send this event.
    Event(ServerEvent),
    /// Close the connection; nothing follows.
    Close,
}

/// Channel sender for delivering outbound traffic to one connection.
pub type ConnectionSender = mpsc::UnboundedSender<ConnectionOutbound>;

/// Commands sent to the registry actor.
pub(crate) enum RegistryCommand {
    /// Register a connection's outbound channel.
    Connect {
        conn: ConnectionId,
        sender: ConnectionSender,
    },

    /// An inbound event from a connection.
    Event {
        conn: ConnectionId,
        event: ClientEvent,
    },

    /// The connection is gone. Sent exactly once per connection.
    Disconnect { conn: ConnectionId },

    Snapshot {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },

    RoomCount { reply: oneshot::Sender<usize> },

    Shutdown,
}

/// Handle to the running registry actor.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Registers `conn` so events addressed to it reach `sender`.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(), RegistryError> {
        self.send(RegistryCommand::Connect { conn, sender }).await
    }

    /// Forwards an inbound event (fire-and-forget).
    pub async fn dispatch(
        &self,
        conn: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), RegistryError> {
        self.send(RegistryCommand::Event { conn, event }).await
    }

    /// Reports that `conn` closed.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RegistryError> {
        self.send(RegistryCommand::Disconnect { conn }).await
    }

    /// Summaries of every room, in room id order.
    pub async fn snapshot(&self) -> Result<Vec<RoomSummary>, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| RegistryError::Unavailable)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> Result<usize, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::RoomCount { reply }).await?;
        rx.await.map_err(|_| RegistryError::Unavailable)
    }

    /// Stops the actor. Pending countdowns are dropped and every
    /// connection's outbound channel closes.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        self.send(RegistryCommand::Shutdown).await
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: RegistryCommand) -> Result<(), RegistryError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RegistryError::Unavailable)
    }
}

struct RegistryActor {
    registry: RoomRegistry,
    /// Outbound channel per connected client.
    senders: HashMap<ConnectionId, ConnectionSender>,
    commands: mpsc::Receiver<RegistryCommand>,
    expiries: mpsc::UnboundedReceiver<Expiry>,
}

impl RegistryActor {
    async fn run(mut self) {
        tracing::info!(
            max_players = self.registry.config().max_players,
            "room registry started"
        );

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(expiry) = self.expiries.recv() => {
                    self.registry.expire(expiry);
                    self.flush();
                }
            }
        }

        tracing::info!(rooms = self.registry.room_count(), "room registry stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RegistryCommand) -> bool {
        match cmd {
            RegistryCommand::Connect { conn, sender } => {
                tracing::debug!(%conn, "connection registered");
                self.senders.insert(conn, sender);
            }
            RegistryCommand::Event { conn, event } => {
                // A closed connection's reader may still have events in
                // flight; none of them act on its behalf.
                if !self.senders.contains_key(&conn) {
                    tracing::debug!(%conn, event = event.name(), "event from closed connection dropped");
                    return true;
                }
                self.handle_event(conn, event);
                self.flush();
            }
            RegistryCommand::Disconnect { conn } => {
                self.registry.disconnect(conn);
                self.flush();
                self.senders.remove(&conn);
                tracing::debug!(%conn, "connection unregistered");
            }
            RegistryCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
            RegistryCommand::RoomCount { reply } => {
                let _ = reply.send(self.registry.room_count());
            }
            RegistryCommand::Shutdown => {
                tracing::info!("room registry shutting down");
                return false;
            }
        }
        true
    }

    fn handle_event(&mut self, conn: ConnectionId, event: ClientEvent) {
        tracing::trace!(%conn, event = event.name(), "inbound event");
        match event {
            ClientEvent::JoinRoom(JoinRoom { room_id, is_admin }) => {
                // Rejections are delivered through the outbox.
                let _ = self.registry.join(conn, room_id, is_admin);
            }
            ClientEvent::Draw(payload) => {
                for room_id in self.registry.rooms_of(conn) {
                    self.registry.relay_draw(conn, &room_id, payload.clone());
                }
            }
            ClientEvent::SetTimer(SetTimer { room_id, duration }) => {
                self.registry.set_timer(conn, &room_id, duration);
            }
            ClientEvent::StopGame(cmd) => {
                self.registry.stop_game(conn, &cmd.room_id);
            }
            ClientEvent::ClearCanvas(cmd) => {
                self.registry.clear_canvas(conn, &cmd.room_id);
            }
        }
    }

    /// Pushes everything the registry produced to the addressed
    /// connections. Sends to connections that already went away are
    /// dropped silently.
    fn flush(&mut self) {
        for delivery in self.registry.take_deliveries() {
            match delivery {
                Delivery::Event { to, event } => {
                    if let Some(sender) = self.senders.get(&to) {
                        let _ = sender.send(ConnectionOutbound::Event(event));
                    }
                }
                Delivery::Close { to } => {
                    if let Some(sender) = self.senders.remove(&to) {
                        let _ = sender.send(ConnectionOutbound::Close);
                    }
                }
            }
        }
    }
}

/// Spawns the registry actor and returns a handle to it.
///
/// Each call creates an independent registry. Must be called inside a
/// Tokio runtime.
pub fn spawn_registry(config: RoomConfig) -> RegistryHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);
    let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

    let actor = RegistryActor {
        registry: RoomRegistry::new(config, expiry_tx),
        senders: HashMap::new(),
        commands: rx,
        expiries: expiry_rx,
    };

    tokio::spawn(actor.run());

    RegistryHandle { sender: tx }
}
