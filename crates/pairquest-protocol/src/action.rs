//! Inbound actions: everything a client can ask the server to do.
//!
//! The set is closed. A frame whose `type` is not one of these variants,
//! or whose fields have the wrong shape, fails to decode and is answered
//! with an error frame instead of reaching any room.

use serde::{Deserialize, Serialize};

use crate::{ClientId, RoomId};

/// One inbound frame.
///
/// `ack` is an optional client-chosen correlation id. `create_room`,
/// `join_room`, `stats` and `heartbeat` echo it back in
/// [`Outbound::Ack`](crate::Outbound::Ack); errors echo it in
/// [`Outbound::Error`](crate::Outbound::Error).
///
/// ```json
/// { "ack": 7, "action": { "type": "join_room", "roomId": "x1Yz", "clientId": "c-1" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub action: Action,
}

/// The closed enumeration of inbound actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Create a room; acknowledged with the new room id.
    CreateRoom {
        num_of_players: usize,
        grid_size: usize,
        theme: String,
        host_client_id: ClientId,
    },

    /// Join (or recover and join) a room; acknowledged with the seat or
    /// `null` when the room is unknown, full, closed, or already joined.
    JoinRoom { room_id: RoomId, client_id: ClientId },

    /// Reveal a tile in the current room.
    Play { index: usize },

    /// Start the game before the room is full.
    Start,

    /// Deal a fresh board to the same roster.
    Restart,

    /// Broadcast `game_over` without touching room state.
    #[serde(rename = "gameover")]
    GameOver,

    /// Leave the current room.
    LeaveRoom,

    /// Read the usage counters; acknowledged with a snapshot.
    Stats,

    /// Keep-alive; acknowledged with both timestamps.
    Heartbeat { client_time: u64 },
}

impl Action {
    /// Wire name of the action, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::Play { .. } => "play",
            Self::Start => "start",
            Self::Restart => "restart",
            Self::GameOver => "gameover",
            Self::LeaveRoom => "leave_room",
            Self::Stats => "stats",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Request, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_create_room_uses_camel_case_fields() {
        let req = decode(
            r#"{"ack":1,"action":{"type":"create_room","numOfPlayers":2,
                "gridSize":16,"theme":"icons","hostClientId":"host-1"}}"#,
        )
        .unwrap();
        assert_eq!(req.ack, Some(1));
        match req.action {
            Action::CreateRoom {
                num_of_players,
                grid_size,
                theme,
                host_client_id,
            } => {
                assert_eq!(num_of_players, 2);
                assert_eq!(grid_size, 16);
                assert_eq!(theme, "icons");
                assert_eq!(host_client_id.as_str(), "host-1");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_unit_actions_decode_without_fields() {
        let req = decode(r#"{"action":{"type":"start"}}"#).unwrap();
        assert_eq!(req.ack, None);
        assert_eq!(req.action, Action::Start);

        let req = decode(r#"{"action":{"type":"gameover"}}"#).unwrap();
        assert_eq!(req.action, Action::GameOver);
    }

    #[test]
    fn test_play_with_negative_index_is_rejected() {
        assert!(decode(r#"{"action":{"type":"play","index":-1}}"#).is_err());
        assert!(decode(r#"{"action":{"type":"play"}}"#).is_err());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = decode(r#"{"action":{"type":"fly_to_moon"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_join_room_validates_room_id() {
        let result = decode(
            r#"{"action":{"type":"join_room","roomId":"bad id","clientId":"c"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_action_name_matches_wire_tag() {
        let json = serde_json::to_value(Action::LeaveRoom).unwrap();
        assert_eq!(json["type"], Action::LeaveRoom.name());
        let json = serde_json::to_value(Action::GameOver).unwrap();
        assert_eq!(json["type"], Action::GameOver.name());
    }
}
