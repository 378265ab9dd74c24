//! Session data types.

use pairquest_protocol::{PlayerId, RoomId};
use tokio::time::Instant;

/// Where a connection currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not in any room.
    Lobby,

    /// Seated in a room.
    InRoom(RoomId),
}

/// One connection's context.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub state: SessionState,
    pub connected_at: Instant,
}

impl Session {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            state: SessionState::Lobby,
            connected_at: Instant::now(),
        }
    }

    /// The room this session is attached to.
    pub fn room_id(&self) -> Option<&RoomId> {
        match &self.state {
            SessionState::InRoom(id) => Some(id),
            SessionState::Lobby => None,
        }
    }
}
