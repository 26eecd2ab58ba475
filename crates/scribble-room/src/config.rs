//! Registry configuration.

use scribble_countdown::CountdownLimits;

/// Settings shared by every room in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Maximum number of players per room, not counting the admin.
    pub max_players: usize,

    /// Bounds on round countdowns requested by admins.
    pub countdown: CountdownLimits,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: Self::DEFAULT_MAX_PLAYERS,
            countdown: CountdownLimits::default(),
        }
    }
}

impl RoomConfig {
    /// Player cap used when none is configured.
    pub const DEFAULT_MAX_PLAYERS: usize = 8;

    /// Default settings with a different player cap.
    pub fn with_max_players(max_players: usize) -> Self {
        Self {
            max_players,
            ..Self::default()
        }
    }

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called by [`RoomRegistry::new`](crate::RoomRegistry::new). A room
    /// must be able to hold at least one player.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            tracing::warn!("max_players must be at least 1, raising to 1");
            self.max_players = 1;
        }
        self
    }
}
