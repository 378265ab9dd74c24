//! Outbound frames: acknowledgements, broadcast events and errors.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

/// The symbol printed on a tile. Every value appears exactly twice on a board.
pub type TileValue = String;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A seat at the table as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    /// 1-based join order.
    pub no: u32,
    pub is_host: bool,
    pub score: u32,
}

/// Static room settings included in a join acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub theme: String,
    pub room_size: usize,
    pub grid_size: usize,
}

/// Successful join acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAccepted {
    pub player: PlayerView,
    pub players: Vec<PlayerView>,
    pub room: RoomView,
}

/// Both usage counters, as answered to a `stats` action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub games_played: u64,
    pub links_created: u64,
}

/// A single counter change pushed to every client. Only the counter that
/// moved is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_played: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_created: Option<u64>,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Broadcast events.
///
/// All are room-scoped except [`ServerEvent::Stats`], which goes to every
/// connected client, and [`ServerEvent::RoomClosed`], which goes to each
/// player still seated in a reaped room. JSON shape: `{"event": "match_found", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// The roster in join order.
    UpdatePlayers(Vec<PlayerView>),

    /// A participant left the room.
    PlayerLeft(PlayerView),

    /// The turn moved to this participant.
    NextPlayer(PlayerId),

    /// Tiles currently face up, awaiting evaluation.
    UpdateFlippedPair(Vec<usize>),

    /// The two flipped tiles matched.
    MatchFound {
        opened: Vec<usize>,
        flipped_pair: Vec<usize>,
        players: Vec<PlayerView>,
    },

    /// The two flipped tiles differed; the turn moved on.
    NoMatch {
        flipped_pair: Vec<usize>,
        next_player: Option<PlayerId>,
    },

    /// Every pair is open (or a member forced the end).
    GameOver,

    /// Fresh board for the same roster, scores reset.
    Restart {
        board_items: Vec<TileValue>,
        next_player: Option<PlayerId>,
        players: Vec<PlayerView>,
    },

    /// The game began.
    StartGame {
        board_items: Vec<TileValue>,
        next_player: Option<PlayerId>,
    },

    /// The room was evicted for inactivity; the recipient is back in the
    /// lobby.
    RoomClosed(RoomId),

    /// A usage counter moved. Global.
    Stats(StatsUpdate),
}

// ---------------------------------------------------------------------------
// Reply / Outbound
// ---------------------------------------------------------------------------

/// Acknowledgement payloads, one per replying action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Reply {
    RoomCreated(RoomId),
    /// `None` serializes as `null`: the room is unavailable.
    Joined(Option<JoinAccepted>),
    Stats(StatsSnapshot),
    Heartbeat { client_time: u64, server_time: u64 },
}

/// HTTP-style error codes carried by [`Outbound::Error`].
pub mod codes {
    pub const BAD_REQUEST: u16 = 400;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL: u16 = 500;
    pub const UNAVAILABLE: u16 = 503;
}

/// Every frame the server writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Outbound {
    /// Answer to a request that carried (or did not carry) an ack id.
    Ack { ack: Option<u64>, reply: Reply },

    /// A broadcast.
    Event(ServerEvent),

    /// The request identified by `ack` failed.
    Error {
        ack: Option<u64>,
        code: u16,
        message: String,
    },
}

impl Outbound {
    pub fn error(ack: Option<u64>, code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            ack,
            code,
            message: message.into(),
        }
    }
}
