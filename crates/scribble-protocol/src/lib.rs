//! Wire protocol for Scribble.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomId`]): the
//!   events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   turned into frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. Events without a payload
//! omit `data`.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Room registry
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use scribble_transport::ConnectionId;
pub use types::{
    ClientEvent, DrawPayload, ErrorNotice, JoinRoom, Joined, PlayerCount,
    RoomCommand, RoomId, Seconds, ServerEvent, SetTimer, TimerStart,
};
