//! The room registry: every room, who is in it, and the role-gated
//! operations that change it.
//!
//! `RoomRegistry` is a plain single-writer value. Every operation runs to
//! completion without awaiting, records the events it produces in an
//! outbox, and leaves delivery to whoever owns the registry (normally the
//! registry actor). Countdown expiries come back in through
//! [`RoomRegistry::expire`] on the same path as every other event.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use scribble_countdown::{Countdown, CountdownId, CountdownSequence};
use scribble_protocol::{
    ConnectionId, DrawPayload, Joined, PlayerCount, RoomId, Seconds, ServerEvent,
    TimerStart,
};
use tokio::sync::mpsc;

use crate::{InvariantViolation, JoinError, Room, RoomConfig, RoomSummary};

/// Something the registry wants done to a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Send `event` to `to`.
    Event { to: ConnectionId, event: ServerEvent },
    /// Close the connection. Always preceded by an `error` event.
    Close { to: ConnectionId },
}

/// A countdown reporting that it ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub room_id: RoomId,
    pub countdown: CountdownId,
}

/// Events produced by the current operation, in emission order.
#[derive(Debug, Default)]
struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    fn send(&mut self, to: ConnectionId, event: ServerEvent) {
        self.deliveries.push(Delivery::Event { to, event });
    }

    fn close(&mut self, to: ConnectionId) {
        self.deliveries.push(Delivery::Close { to });
    }

    fn broadcast(&mut self, room: &Room, event: ServerEvent) {
        for member in room.members() {
            self.send(member, event.clone());
        }
    }

    fn broadcast_except(&mut self, room: &Room, except: ConnectionId, event: ServerEvent) {
        for member in room.members().filter(|m| *m != except) {
            self.send(member, event.clone());
        }
    }

    fn reject(&mut self, conn: ConnectionId, err: JoinError) -> JoinError {
        tracing::debug!(%conn, room_id = %err.room_id(), reason = %err, "join rejected");
        self.send(conn, ServerEvent::error(err.to_string()));
        self.close(conn);
        err
    }
}

/// In-memory table of rooms plus a connection → rooms index.
pub struct RoomRegistry {
    config: RoomConfig,
    rooms: HashMap<RoomId, Room>,
    /// Every room each connection currently belongs to, in any role.
    memberships: HashMap<ConnectionId, BTreeSet<RoomId>>,
    countdowns: CountdownSequence,
    expiries: mpsc::UnboundedSender<Expiry>,
    outbox: Outbox,
}

impl RoomRegistry {
    /// Creates an empty registry. Countdown expiries will be delivered on
    /// `expiries`; feed them back through [`expire`](Self::expire).
    pub fn new(config: RoomConfig, expiries: mpsc::UnboundedSender<Expiry>) -> Self {
        Self {
            config: config.validated(),
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            countdowns: CountdownSequence::new(),
            expiries,
            outbox: Outbox::default(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Drains the events produced since the last call.
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox.deliveries)
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Joins `caller` to `room_id` as admin or player.
    ///
    /// On success the caller gets `joined` and the whole room (caller
    /// included) gets `playerCountUpdate`. On failure the caller gets
    /// `error` followed by a close, and nothing else changes.
    pub fn join(
        &mut self,
        caller: ConnectionId,
        room_id: RoomId,
        wants_admin: bool,
    ) -> Result<Joined, JoinError> {
        let max_players = self.config.max_players;

        let room = match self.rooms.entry(room_id.clone()) {
            Entry::Vacant(slot) => {
                if !wants_admin {
                    return Err(self.outbox.reject(caller, JoinError::RoomNotFound(room_id)));
                }
                tracing::info!(%room_id, admin = %caller, "room created");
                slot.insert(Room::new(room_id.clone(), caller))
            }
            Entry::Occupied(slot) => {
                let room = slot.into_mut();
                if let Err(err) = room.admit(caller, wants_admin, max_players) {
                    return Err(self.outbox.reject(caller, err));
                }
                room
            }
        };

        self.memberships
            .entry(caller)
            .or_default()
            .insert(room_id.clone());

        let joined = Joined {
            is_admin: room.is_admin(caller),
            player_count: room.player_count(),
            max_players,
            round_active: room.is_round_active(),
        };
        tracing::info!(
            %room_id,
            conn = %caller,
            admin = joined.is_admin,
            players = joined.player_count,
            "joined room"
        );

        self.outbox.send(caller, ServerEvent::Joined(joined.clone()));
        self.outbox.broadcast(
            room,
            ServerEvent::PlayerCountUpdate(PlayerCount {
                player_count: joined.player_count,
                max_players,
            }),
        );

        self.debug_verify();
        Ok(joined)
    }

    /// Relays a player's canvas update to the rest of the room.
    ///
    /// Dropped unless a round is running and `caller` is one of the
    /// room's players. Returns whether the payload was relayed.
    pub fn relay_draw(
        &mut self,
        caller: ConnectionId,
        room_id: &RoomId,
        payload: DrawPayload,
    ) -> bool {
        let Some(room) = self.rooms.get(room_id) else {
            return false;
        };
        if !room.is_round_active() || !room.is_player(caller) {
            tracing::trace!(%room_id, conn = %caller, "draw dropped");
            return false;
        }
        self.outbox
            .broadcast_except(room, caller, ServerEvent::Draw(payload));
        true
    }

    /// Admin: starts a round of `requested` seconds, replacing any
    /// running one.
    ///
    /// Non-admin callers are ignored without any reply, as are negative
    /// or NaN durations. Durations above the configured maximum are
    /// capped, and `timerStart` reports the capped value. Returns whether
    /// the command was accepted.
    pub fn set_timer(
        &mut self,
        caller: ConnectionId,
        room_id: &RoomId,
        requested: Seconds,
    ) -> bool {
        let Some(room) = admin_room(&mut self.rooms, caller, room_id) else {
            return false;
        };
        let Some(duration) = requested.to_duration() else {
            tracing::debug!(%room_id, %requested, "invalid round duration ignored");
            return false;
        };

        let duration = self.config.countdown.clamp(duration);
        let id = self.countdowns.next_id();
        let expiry = Expiry {
            room_id: room_id.clone(),
            countdown: id,
        };
        room.start_round(Countdown::start(id, duration, self.expiries.clone(), expiry));
        tracing::info!(%room_id, secs = duration.as_secs_f64(), countdown = %id, "round started");

        self.outbox.broadcast(
            room,
            ServerEvent::TimerStart(TimerStart {
                duration: Seconds::from(duration),
            }),
        );
        self.debug_verify();
        true
    }

    /// Admin: ends the current round early. Announced even when no round
    /// was running.
    pub fn stop_game(&mut self, caller: ConnectionId, room_id: &RoomId) -> bool {
        let Some(room) = admin_room(&mut self.rooms, caller, room_id) else {
            return false;
        };
        let was_active = room.end_round();
        tracing::info!(%room_id, was_active, "game stopped");
        self.outbox.broadcast(room, ServerEvent::GameStopped);
        true
    }

    /// Admin: tells every member to wipe its canvas.
    pub fn clear_canvas(&mut self, caller: ConnectionId, room_id: &RoomId) -> bool {
        let Some(room) = admin_room(&mut self.rooms, caller, room_id) else {
            return false;
        };
        tracing::debug!(%room_id, "canvas cleared");
        self.outbox.broadcast(room, ServerEvent::CanvasCleared);
        true
    }

    /// Removes `caller` from every room it belongs to.
    ///
    /// An admin leaving ends the round and announces `adminLeft`; a player
    /// leaving announces the new count. Rooms left with nobody in them are
    /// dropped on the spot. Calling this for an unknown connection is a
    /// no-op.
    pub fn disconnect(&mut self, caller: ConnectionId) {
        let Some(room_ids) = self.memberships.remove(&caller) else {
            return;
        };
        let max_players = self.config.max_players;

        for room_id in room_ids {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };

            if room.is_admin(caller) {
                room.remove_admin();
                tracing::info!(%room_id, conn = %caller, "admin left");
                self.outbox.broadcast(room, ServerEvent::AdminLeft);
            } else if room.remove_player(caller) {
                tracing::info!(
                    %room_id,
                    conn = %caller,
                    players = room.player_count(),
                    "player left"
                );
                self.outbox.broadcast(
                    room,
                    ServerEvent::PlayerCountUpdate(PlayerCount {
                        player_count: room.player_count(),
                        max_players,
                    }),
                );
            }

            if room.is_empty() {
                self.rooms.remove(&room_id);
                tracing::info!(%room_id, "room destroyed");
            }
        }

        self.debug_verify();
    }

    /// Handles a countdown running out.
    ///
    /// Ignored when the room is gone or the countdown was superseded or
    /// stopped after the expiry was queued. Returns whether the round
    /// ended.
    pub fn expire(&mut self, expiry: Expiry) -> bool {
        let Some(room) = self.rooms.get_mut(&expiry.room_id) else {
            tracing::trace!(room_id = %expiry.room_id, "expiry for missing room");
            return false;
        };
        if room.countdown_id() != Some(expiry.countdown) {
            tracing::trace!(
                room_id = %expiry.room_id,
                countdown = %expiry.countdown,
                "stale expiry ignored"
            );
            return false;
        }

        room.end_round();
        tracing::info!(room_id = %expiry.room_id, "round ended");
        self.outbox.broadcast(room, ServerEvent::TimerEnd);
        true
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Rooms `conn` belongs to, in room id order.
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<RoomId> {
        self.memberships
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// One summary per room, in room id order.
    pub fn snapshot(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.rooms.values().map(Room::summary).collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Checks every room invariant and the membership index.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        for room in self.rooms.values() {
            room.verify(self.config.max_players)?;
            for member in room.members() {
                let indexed = self
                    .memberships
                    .get(&member)
                    .is_some_and(|rooms| rooms.contains(room.id()));
                if !indexed {
                    return Err(InvariantViolation::IndexMismatch {
                        room_id: room.id().clone(),
                        conn: member,
                    });
                }
            }
        }
        for (conn, room_ids) in &self.memberships {
            for room_id in room_ids {
                let member = self
                    .rooms
                    .get(room_id)
                    .is_some_and(|room| room.contains(*conn));
                if !member {
                    return Err(InvariantViolation::IndexMismatch {
                        room_id: room_id.clone(),
                        conn: *conn,
                    });
                }
            }
        }
        Ok(())
    }

    fn debug_verify(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.verify() {
                tracing::error!(%violation, "registry invariant violated");
            }
        }
    }
}

/// Looks up `room_id` if `caller` is its admin. Anyone else gets `None`,
/// and the command is dropped without a reply.
fn admin_room<'a>(
    rooms: &'a mut HashMap<RoomId, Room>,
    caller: ConnectionId,
    room_id: &RoomId,
) -> Option<&'a mut Room> {
    match rooms.get_mut(room_id) {
        Some(room) if room.is_admin(caller) => Some(room),
        _ => {
            tracing::debug!(%room_id, conn = %caller, "unauthorized command ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_violation_is_reported_not_fatal() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut reg = RoomRegistry::new(RoomConfig::default(), tx);
        let stray = ConnectionId::new(9);
        reg.memberships
            .entry(stray)
            .or_default()
            .insert(RoomId::new("gone"));

        // Mutations keep working on a corrupted registry.
        let joined = reg.join(ConnectionId::new(1), RoomId::new("r"), true);
        assert!(joined.is_ok());
        assert_eq!(
            reg.verify(),
            Err(InvariantViolation::IndexMismatch {
                room_id: RoomId::new("gone"),
                conn: stray,
            })
        );
    }
}
