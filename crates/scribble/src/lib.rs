//! # Scribble
//!
//! Real-time multiplayer drawing game server.
//!
//! Clients connect over WebSocket and exchange JSON events. One client
//! creates a room as its admin and runs timed rounds; up to
//! `max_players` players join and stream canvas updates to each other
//! while a round is active.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scribble::prelude::*;
//!
//! # async fn run() -> Result<(), ScribbleError> {
//! let server = ScribbleServer::builder()
//!     .bind("127.0.0.1:5000")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod error;
mod handler;
pub mod logging;
mod server;

pub use error::ScribbleError;
pub use server::{ScribbleServer, ScribbleServerBuilder, DEFAULT_BIND_ADDR};

pub mod prelude {
    pub use crate::{ScribbleError, ScribbleServer, ScribbleServerBuilder};
    pub use scribble_countdown::CountdownLimits;
    pub use scribble_protocol::{ClientEvent, Codec, JsonCodec, RoomId, ServerEvent};
    pub use scribble_room::{RegistryHandle, RoomConfig, RoomSummary};
    pub use scribble_transport::{ConnectionId, OriginPolicy};
}
