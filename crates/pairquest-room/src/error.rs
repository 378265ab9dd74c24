//! Error types for the room layer.

use pairquest_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
///
/// Rejected joins are not errors: [`RoomRegistry::join_room`](crate::RoomRegistry::join_room)
/// returns `Ok(None)` for an unknown, full or closed room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room is not resident in this process.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The player is not a member of the room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// Create-room settings were rejected.
    #[error("invalid room settings: {0}")]
    InvalidSettings(String),

    /// The tile cannot be flipped right now.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Turn enforcement is on and it is someone else's turn.
    #[error("it is not player {0}'s turn")]
    NotYourTurn(PlayerId),

    /// Host-only controls are on and the player is not the host.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The durable store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the durable key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the command. Retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded.
    #[error("corrupt value at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A counter key holds something other than an integer.
    #[error("counter {0} does not hold an integer")]
    NotAnInteger(String),

    /// A room record parsed but holds settings no room can be built from.
    #[error("invalid room record at {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    /// A room record was written by a newer schema.
    #[error("unsupported room record version {0}")]
    UnsupportedVersion(u32),
}

impl StoreError {
    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
