use pairquest_protocol::{ProtocolError, codes};
use pairquest_room::{RoomError, StoreError};
use pairquest_session::SessionError;
use pairquest_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PairQuestError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown player, not in a room).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (invalid move, unknown room, store failure).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The durable store failed outside any room operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The HTTP endpoints could not be started.
    #[error("http endpoint failed: {0}")]
    Http(String),

    /// The global tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PairQuestError {
    /// Error code reported to the client that caused this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) => codes::BAD_REQUEST,
            Self::Session(SessionError::NotFound(_)) => codes::NOT_FOUND,
            Self::Session(_) => codes::CONFLICT,
            Self::Room(err) => match err {
                RoomError::NotFound(_) => codes::NOT_FOUND,
                RoomError::NotInRoom(..) => codes::CONFLICT,
                RoomError::InvalidSettings(_) | RoomError::InvalidMove(_) => codes::BAD_REQUEST,
                RoomError::NotYourTurn(_) | RoomError::NotHost(_) => codes::FORBIDDEN,
                RoomError::Store(err) => store_code(err),
            },
            Self::Store(err) => store_code(err),
            _ => codes::UNAVAILABLE,
        }
    }
}

/// 503 while the store is unreachable, 500 for anything retrying cannot fix.
fn store_code(err: &StoreError) -> u16 {
    if err.is_transient() {
        codes::UNAVAILABLE
    } else {
        codes::INTERNAL
    }
}
