//! Room registry and round state machine for Scribble.
//!
//! A room has one admin slot, a bounded set of players, and at most one
//! running round countdown. All rooms live in a single [`RoomRegistry`]
//! owned by one actor task, so every change to any room is applied in a
//! single, total order without locks.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: the state machine (join, draw relay, admin commands,
//!   disconnect cleanup, countdown expiry)
//! - [`RegistryHandle`]: send commands to the running registry actor
//! - [`Room`] / [`RoomSummary`]: one room and its read-only summary
//! - [`RoomConfig`]: player cap and countdown limits
//! - [`JoinError`]: why a join was refused

mod actor;
mod config;
mod error;
mod registry;
mod room;

pub use actor::{spawn_registry, ConnectionOutbound, ConnectionSender, RegistryHandle};
pub use config::RoomConfig;
pub use error::{InvariantViolation, JoinError, RegistryError};
pub use registry::{Delivery, Expiry, RoomRegistry};
pub use room::{Room, RoomSummary};
