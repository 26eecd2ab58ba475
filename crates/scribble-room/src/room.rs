//! A single room: one admin slot, a bounded player set, and at most one
//! running countdown.

use std::collections::BTreeSet;

use scribble_countdown::{Countdown, CountdownId};
use scribble_protocol::{ConnectionId, RoomId};
use serde::Serialize;

use crate::{InvariantViolation, JoinError};

/// Read-only view of a room for operational tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub player_count: usize,
    pub has_admin: bool,
    pub round_active: bool,
}

/// One game session.
///
/// A round is active exactly while `countdown` holds a handle, so the two
/// can never disagree.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    admin: Option<ConnectionId>,
    players: BTreeSet<ConnectionId>,
    countdown: Option<Countdown>,
}

impl Room {
    /// Creates a room with `admin` in the admin slot and no players.
    pub(crate) fn new(id: RoomId, admin: ConnectionId) -> Self {
        Self {
            id,
            admin: Some(admin),
            players: BTreeSet::new(),
            countdown: None,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn admin(&self) -> Option<ConnectionId> {
        self.admin
    }

    pub fn has_admin(&self) -> bool {
        self.admin.is_some()
    }

    pub fn is_admin(&self, conn: ConnectionId) -> bool {
        self.admin == Some(conn)
    }

    pub fn is_player(&self, conn: ConnectionId) -> bool {
        self.players.contains(&conn)
    }

    /// Whether `conn` is the admin or one of the players.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.is_admin(conn) || self.is_player(conn)
    }

    /// Players in ascending id order.
    pub fn players(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().copied()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Every member: the admin first (if any), then the players.
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.admin.into_iter().chain(self.players())
    }

    pub fn is_round_active(&self) -> bool {
        self.countdown.is_some()
    }

    /// Id of the running countdown, if a round is active.
    pub fn countdown_id(&self) -> Option<CountdownId> {
        self.countdown.as_ref().map(Countdown::id)
    }

    /// No admin and no players.
    pub fn is_empty(&self) -> bool {
        self.admin.is_none() && self.players.is_empty()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            player_count: self.players.len(),
            has_admin: self.has_admin(),
            round_active: self.is_round_active(),
        }
    }

    /// Admits `conn` into an existing room.
    ///
    /// An admin request fails whenever the slot is held, even by `conn`
    /// itself. A player request fails once the player set is at capacity,
    /// even when `conn` is already in it. A player claiming a free admin
    /// slot leaves the player set, and the current admin asking to join as
    /// a player keeps the admin role.
    pub(crate) fn admit(
        &mut self,
        conn: ConnectionId,
        wants_admin: bool,
        max_players: usize,
    ) -> Result<(), JoinError> {
        if wants_admin {
            if self.admin.is_some() {
                return Err(JoinError::AdminSlotTaken(self.id.clone()));
            }
            self.players.remove(&conn);
            self.admin = Some(conn);
            return Ok(());
        }

        if self.is_admin(conn) {
            return Ok(());
        }
        if self.players.len() >= max_players {
            return Err(JoinError::RoomFull {
                room_id: self.id.clone(),
                max_players,
            });
        }
        self.players.insert(conn);
        Ok(())
    }

    /// Installs `countdown` as the running round, cancelling any previous
    /// one.
    pub(crate) fn start_round(&mut self, countdown: Countdown) {
        if let Some(mut previous) = self.countdown.replace(countdown) {
            previous.cancel();
        }
    }

    /// Ends the round, cancelling its countdown. Returns whether a round
    /// was running.
    pub(crate) fn end_round(&mut self) -> bool {
        match self.countdown.take() {
            Some(mut countdown) => {
                countdown.cancel();
                true
            }
            None => false,
        }
    }

    /// Clears the admin slot. A round cannot outlive its admin.
    pub(crate) fn remove_admin(&mut self) {
        self.admin = None;
        self.end_round();
    }

    /// Returns `true` if `conn` was a player.
    pub(crate) fn remove_player(&mut self, conn: ConnectionId) -> bool {
        self.players.remove(&conn)
    }

    pub(crate) fn verify(&self, max_players: usize) -> Result<(), InvariantViolation> {
        if let Some(admin) = self.admin {
            if self.players.contains(&admin) {
                return Err(InvariantViolation::AdminIsPlayer {
                    room_id: self.id.clone(),
                    conn: admin,
                });
            }
        }
        if self.players.len() > max_players {
            return Err(InvariantViolation::OverCapacity {
                room_id: self.id.clone(),
                players: self.players.len(),
                max_players,
            });
        }
        if self.is_empty() {
            return Err(InvariantViolation::EmptyRoom(self.id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room_with_admin(admin: u64) -> Room {
        Room::new(RoomId::new("r"), conn(admin))
    }

    #[test]
    fn test_new_room_has_admin_and_no_round() {
        let room = room_with_admin(1);
        assert!(room.is_admin(conn(1)));
        assert_eq!(room.player_count(), 0);
        assert!(!room.is_round_active());
        assert!(!room.is_empty());
        assert!(room.verify(8).is_ok());
    }

    #[test]
    fn test_admit_player_until_full() {
        let mut room = room_with_admin(1);
        room.admit(conn(2), false, 2).unwrap();
        room.admit(conn(3), false, 2).unwrap();
        let err = room.admit(conn(4), false, 2).unwrap_err();
        assert!(matches!(err, JoinError::RoomFull { max_players: 2, .. }));
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn test_rejoin_as_player_below_capacity_is_idempotent() {
        let mut room = room_with_admin(1);
        room.admit(conn(2), false, 2).unwrap();
        room.admit(conn(2), false, 2).unwrap();
        assert_eq!(room.player_count(), 1);
        assert!(room.verify(2).is_ok());
    }

    #[test]
    fn test_rejoin_as_player_at_capacity_is_full() {
        let mut room = room_with_admin(1);
        room.admit(conn(2), false, 1).unwrap();
        let err = room.admit(conn(2), false, 1).unwrap_err();
        assert!(matches!(err, JoinError::RoomFull { max_players: 1, .. }));
        assert!(room.is_player(conn(2)));
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_admin_slot_taken() {
        let mut room = room_with_admin(1);
        let err = room.admit(conn(2), true, 8).unwrap_err();
        assert_eq!(err, JoinError::AdminSlotTaken(RoomId::new("r")));
        assert_eq!(room.admin(), Some(conn(1)));
        // The sitting admin asking for the slot again is refused as well.
        let err = room.admit(conn(1), true, 8).unwrap_err();
        assert_eq!(err, JoinError::AdminSlotTaken(RoomId::new("r")));
        assert_eq!(room.admin(), Some(conn(1)));
    }

    #[test]
    fn test_admin_joining_as_player_stays_admin() {
        let mut room = room_with_admin(1);
        room.admit(conn(1), false, 8).unwrap();
        assert!(room.is_admin(conn(1)));
        assert!(!room.is_player(conn(1)));
        assert!(room.verify(8).is_ok());
    }

    #[test]
    fn test_player_promoted_to_free_admin_slot_leaves_players() {
        let mut room = room_with_admin(1);
        room.admit(conn(2), false, 8).unwrap();
        room.remove_admin();
        room.admit(conn(2), true, 8).unwrap();
        assert!(room.is_admin(conn(2)));
        assert!(!room.is_player(conn(2)));
        assert!(room.verify(8).is_ok());
    }

    #[test]
    fn test_members_lists_admin_first() {
        let mut room = room_with_admin(5);
        room.admit(conn(3), false, 8).unwrap();
        room.admit(conn(2), false, 8).unwrap();
        let members: Vec<_> = room.members().collect();
        assert_eq!(members, vec![conn(5), conn(2), conn(3)]);
    }

    #[test]
    fn test_empty_room_fails_verification() {
        let mut room = room_with_admin(1);
        room.remove_admin();
        assert!(room.is_empty());
        assert_eq!(
            room.verify(8),
            Err(InvariantViolation::EmptyRoom(RoomId::new("r")))
        );
    }

    #[test]
    fn test_summary() {
        let mut room = room_with_admin(1);
        room.admit(conn(2), false, 8).unwrap();
        assert_eq!(
            room.summary(),
            RoomSummary {
                room_id: RoomId::new("r"),
                player_count: 1,
                has_admin: true,
                round_active: false,
            }
        );
    }
}
