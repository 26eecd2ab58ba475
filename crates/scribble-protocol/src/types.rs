//! Event types for Scribble's wire format.
//!
//! Both directions use the same adjacently tagged JSON shape:
//!
//! ```text
//! {"event": "joinRoom", "data": {"roomId": "abc", "isAdmin": true}}
//! {"event": "timerEnd"}
//! ```
//!
//! Event names and payload fields are camelCase so browser clients can
//! use them without renaming.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a room, chosen by the client that creates it.
///
/// The server never generates room ids and never checks them for
/// uniqueness: the first admin to join an unknown id creates the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a client-supplied room name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The room name as sent by the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A number of seconds as it appears on the wire.
///
/// Clients may send fractional values (`2.5`). Whole values are written
/// back as integers, so `5` round-trips as `5` rather than `5.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Seconds(f64);

impl Seconds {
    pub fn new(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// The duration this stands for, or `None` for negative or NaN
    /// values. Values too large for a [`Duration`] saturate to
    /// [`Duration::MAX`].
    pub fn to_duration(self) -> Option<Duration> {
        if self.0.is_nan() || self.0 < 0.0 {
            return None;
        }
        Some(Duration::try_from_secs_f64(self.0).unwrap_or(Duration::MAX))
    }
}

impl From<Duration> for Seconds {
    fn from(duration: Duration) -> Self {
        Self(duration.as_secs_f64())
    }
}

impl From<u64> for Seconds {
    fn from(secs: u64) -> Self {
        Self(secs as f64)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = self.0;
        if secs.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(&secs) {
            serializer.serialize_u64(secs as u64)
        } else {
            serializer.serialize_f64(secs)
        }
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self)
    }
}

/// Canvas data sent by a drawing player.
///
/// The server never looks inside: whatever JSON the client sent is
/// relayed to the other members unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawPayload(pub serde_json::Value);

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Payload of `joinRoom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: RoomId,
    #[serde(default)]
    pub is_admin: bool,
}

/// Payload of `setTimer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTimer {
    pub room_id: RoomId,
    /// Round length. Fractions are allowed; negative values are ignored
    /// by the server.
    pub duration: Seconds,
}

/// Payload of the admin commands that only name a room
/// (`stopGame`, `clearCanvas`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCommand {
    pub room_id: RoomId,
}

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a room as admin or player.
    JoinRoom(JoinRoom),
    /// Canvas update from a player. Relayed to the rest of the room.
    Draw(DrawPayload),
    /// Admin: start (or restart) the round countdown.
    SetTimer(SetTimer),
    /// Admin: end the round early.
    StopGame(RoomCommand),
    /// Admin: tell every client to wipe its canvas.
    ClearCanvas(RoomCommand),
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "joinRoom",
            Self::Draw(_) => "draw",
            Self::SetTimer(_) => "setTimer",
            Self::StopGame(_) => "stopGame",
            Self::ClearCanvas(_) => "clearCanvas",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Payload of `joined`, sent only to the connection that joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub is_admin: bool,
    pub player_count: usize,
    pub max_players: usize,
    pub round_active: bool,
}

/// Payload of `playerCountUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCount {
    pub player_count: usize,
    pub max_players: usize,
}

/// Payload of `error`. Always followed by the server closing the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

/// Payload of `timerStart`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerStart {
    /// The round length actually scheduled: the requested value, capped
    /// at the server's maximum round length.
    pub duration: Seconds,
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Joined(Joined),
    PlayerCountUpdate(PlayerCount),
    Error(ErrorNotice),
    TimerStart(TimerStart),
    TimerEnd,
    GameStopped,
    CanvasCleared,
    AdminLeft,
    Draw(DrawPayload),
}

impl ServerEvent {
    /// Builds an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice {
            message: message.into(),
        })
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Joined(_) => "joined",
            Self::PlayerCountUpdate(_) => "playerCountUpdate",
            Self::Error(_) => "error",
            Self::TimerStart(_) => "timerStart",
            Self::TimerEnd => "timerEnd",
            Self::GameStopped => "gameStopped",
            Self::CanvasCleared => "canvasCleared",
            Self::AdminLeft => "adminLeft",
            Self::Draw(_) => "draw",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_join_room_wire_shape() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "joinRoom",
            "data": { "roomId": "lobby", "isAdmin": true }
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom(JoinRoom {
                room_id: RoomId::new("lobby"),
                is_admin: true,
            })
        );
    }

    #[test]
    fn test_join_room_is_admin_defaults_to_false() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "joinRoom",
            "data": { "roomId": "lobby" }
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::JoinRoom(JoinRoom { is_admin: false, .. })));
    }

    #[test]
    fn test_draw_payload_is_opaque() {
        let stroke = json!({ "x0": 1, "y0": 2, "color": "#ff0000", "nested": [1, {"a": null}] });
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "draw",
            "data": stroke.clone()
        }))
        .unwrap();
        assert_eq!(event, ClientEvent::Draw(DrawPayload(stroke)));
    }

    #[test]
    fn test_unit_server_events_omit_data() {
        let value = serde_json::to_value(ServerEvent::TimerEnd).unwrap();
        assert_eq!(value, json!({ "event": "timerEnd" }));
        let value = serde_json::to_value(ServerEvent::AdminLeft).unwrap();
        assert_eq!(value, json!({ "event": "adminLeft" }));
    }

    #[test]
    fn test_joined_uses_camel_case_fields() {
        let value = serde_json::to_value(ServerEvent::Joined(Joined {
            is_admin: false,
            player_count: 3,
            max_players: 8,
            round_active: true,
        }))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "event": "joined",
                "data": {
                    "isAdmin": false,
                    "playerCount": 3,
                    "maxPlayers": 8,
                    "roundActive": true
                }
            })
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result: Result<ClientEvent, _> = serde_json::from_value(json!({
            "event": "kickPlayer",
            "data": { "roomId": "x" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        let events = [
            ServerEvent::error("nope"),
            ServerEvent::TimerStart(TimerStart { duration: Seconds::from(5) }),
            ServerEvent::GameStopped,
            ServerEvent::CanvasCleared,
            ServerEvent::PlayerCountUpdate(PlayerCount { player_count: 1, max_players: 2 }),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_seconds_keep_whole_values_integral() {
        let whole = serde_json::to_value(TimerStart { duration: Seconds::from(60) }).unwrap();
        assert_eq!(whole, json!({ "duration": 60 }));
        let fractional = serde_json::to_value(TimerStart { duration: Seconds::new(2.5) }).unwrap();
        assert_eq!(fractional, json!({ "duration": 2.5 }));
    }

    #[test]
    fn test_seconds_to_duration() {
        assert_eq!(Seconds::new(2.5).to_duration(), Some(Duration::from_millis(2500)));
        assert_eq!(Seconds::from(0).to_duration(), Some(Duration::ZERO));
        assert_eq!(Seconds::new(-1.0).to_duration(), None);
        assert_eq!(Seconds::new(f64::NAN).to_duration(), None);
        assert_eq!(Seconds::new(1e300).to_duration(), Some(Duration::MAX));
        assert_eq!(Seconds::from(Duration::from_millis(1500)), Seconds::new(1.5));
    }

    #[test]
    fn test_room_id_display_is_raw_name() {
        assert_eq!(RoomId::from("art-club").to_string(), "art-club");
    }
}
