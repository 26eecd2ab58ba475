//! Error types for the room layer.

use scribble_protocol::{ConnectionId, RoomId};

/// Why a `joinRoom` attempt was refused.
///
/// The `Display` text is what the rejected client receives in its
/// `error` event, right before the server closes the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// A player tried to join a room that no admin has created.
    #[error("Room does not exist")]
    RoomNotFound(RoomId),

    /// An admin tried to join a room whose admin slot is held.
    #[error("Room already has an admin")]
    AdminSlotTaken(RoomId),

    /// A player tried to join a room at capacity.
    #[error("Room is full (max {max_players} players)")]
    RoomFull { room_id: RoomId, max_players: usize },
}

impl JoinError {
    /// The room the join was aimed at.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::RoomNotFound(id) | Self::AdminSlotTaken(id) => id,
            Self::RoomFull { room_id, .. } => room_id,
        }
    }
}

/// The registry actor could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The actor's command channel is closed or its reply was dropped.
    #[error("room registry is unavailable")]
    Unavailable,
}

/// A broken registry invariant, reported by
/// [`RoomRegistry::verify`](crate::RoomRegistry::verify).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{conn} is both admin and player of room {room_id}")]
    AdminIsPlayer { room_id: RoomId, conn: ConnectionId },

    #[error("room {room_id} has {players} players, max is {max_players}")]
    OverCapacity {
        room_id: RoomId,
        players: usize,
        max_players: usize,
    },

    #[error("room {0} is empty but still registered")]
    EmptyRoom(RoomId),

    #[error("membership index disagrees with room {room_id} about {conn}")]
    IndexMismatch { room_id: RoomId, conn: ConnectionId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_error_messages_are_client_facing() {
        let room = RoomId::new("r");
        assert_eq!(JoinError::RoomNotFound(room.clone()).to_string(), "Room does not exist");
        assert_eq!(
            JoinError::AdminSlotTaken(room.clone()).to_string(),
            "Room already has an admin"
        );
        assert_eq!(
            JoinError::RoomFull { room_id: room, max_players: 8 }.to_string(),
            "Room is full (max 8 players)"
        );
    }

    #[test]
    fn test_join_error_room_id() {
        let err = JoinError::RoomFull { room_id: RoomId::new("r9"), max_players: 2 };
        assert_eq!(err.room_id().as_str(), "r9");
    }
}
