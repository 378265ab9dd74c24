//! Room settings, optional rules, and lifecycle phase.

use std::fmt;

use pairquest_protocol::ClientId;
use serde::{Deserialize, Serialize};

use crate::{RoomError, Theme};

/// Smallest room that can be created.
pub const MIN_CAPACITY: usize = 2;

/// Largest room that can be created.
pub const MAX_CAPACITY: usize = 8;

/// Smallest board: two pairs.
pub const MIN_GRID_SIZE: usize = 4;

/// What a room is created with. This is also everything the durable record
/// keeps, so a recovered room is rebuilt from it alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// Number of seats. The room starts on its own once they are all taken.
    pub capacity: usize,
    /// Number of tiles on the board.
    pub grid_size: usize,
    pub theme: Theme,
    /// Whoever joins with this client id is the host.
    pub host_client_id: ClientId,
}

impl RoomSettings {
    /// Checks the settings before a room is created.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidSettings`] when the capacity is outside
    /// `MIN_CAPACITY..=MAX_CAPACITY`, the grid is odd or smaller than
    /// [`MIN_GRID_SIZE`], or the theme has too few symbols for the grid.
    pub fn validate(&self) -> Result<(), RoomError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(RoomError::InvalidSettings(format!(
                "room size must be {MIN_CAPACITY}-{MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }
        if self.grid_size < MIN_GRID_SIZE || self.grid_size % 2 != 0 {
            return Err(RoomError::InvalidSettings(format!(
                "grid size must be even and at least {MIN_GRID_SIZE}, got {}",
                self.grid_size
            )));
        }
        if self.grid_size > self.theme.max_grid_size() {
            return Err(RoomError::InvalidSettings(format!(
                "theme {} supports at most {} tiles, got {}",
                self.theme,
                self.theme.max_grid_size(),
                self.grid_size
            )));
        }
        Ok(())
    }
}

/// Authorization checks a room applies on top of the game rules.
///
/// Both are off by default: any member may play at any time and any member
/// may start or restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRules {
    /// Only the turn holder may flip tiles.
    pub enforce_turns: bool,
    /// Only the host may start or restart.
    pub host_only_controls: bool,
}

/// Coarse lifecycle phase, derived from the room's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Accepting joins.
    Open,
    /// A game is in progress.
    Started,
    /// Every pair is open; waiting for a restart or for everyone to leave.
    Ended,
}

impl RoomPhase {
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Started => f.write_str("started"),
            Self::Ended => f.write_str("ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(capacity: usize, grid_size: usize, theme: Theme) -> RoomSettings {
        RoomSettings {
            capacity,
            grid_size,
            theme,
            host_client_id: ClientId::parse("host").unwrap(),
        }
    }

    #[test]
    fn test_validate_accepts_typical_settings() {
        assert!(settings(2, 16, Theme::Icons).validate().is_ok());
        assert!(settings(8, 4, Theme::Letters).validate().is_ok());
        assert!(settings(4, 100, Theme::Numbers).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_capacity_out_of_range() {
        assert!(settings(1, 16, Theme::Icons).validate().is_err());
        assert!(settings(9, 16, Theme::Icons).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_odd_or_small_grid() {
        assert!(settings(2, 15, Theme::Numbers).validate().is_err());
        assert!(settings(2, 2, Theme::Numbers).validate().is_err());
        assert!(settings(2, 0, Theme::Numbers).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_grid_larger_than_theme() {
        let err = settings(2, 54, Theme::Letters).validate().unwrap_err();
        assert!(err.to_string().contains("letters"), "got: {err}");
        assert!(settings(2, 52, Theme::Letters).validate().is_ok());
    }

    #[test]
    fn test_room_rules_default_trusts_clients() {
        let rules = RoomRules::default();
        assert!(!rules.enforce_turns);
        assert!(!rules.host_only_controls);
    }
}
