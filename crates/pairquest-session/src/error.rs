//! Error types for the session layer.

use pairquest_protocol::{PlayerId, RoomId};

/// Errors that can occur in the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is open for this player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// A session for this player is already open.
    #[error("player {0} already has an open session")]
    AlreadyOpen(PlayerId),

    /// The player is already attached to a room.
    #[error("player {player_id} is already in room {room_id}")]
    AlreadyInRoom { player_id: PlayerId, room_id: RoomId },

    /// The action needs a room but the player has not joined one.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),
}
