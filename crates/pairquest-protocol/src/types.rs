//! Identity types and delivery targets shared by every layer.
//!
//! Identifiers that arrive from clients (`RoomId`, `ClientId`) are validated
//! while they are deserialized, so a malformed id never reaches the room
//! layer. Serde's `try_from = "String"` runs the check for us and turns a
//! failure into an ordinary decode error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Identity of a participant.
///
/// One per live connection: the server derives it from the transport's
/// connection id, so it is opaque to clients and never reused within a
/// process. Serialized as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Longest room id accepted from the wire.
pub const ROOM_ID_MAX_LEN: usize = 32;

/// Short, URL-safe room identifier (the share link carries it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a room id.
    ///
    /// Accepts 1 to [`ROOM_ID_MAX_LEN`] characters from `[A-Za-z0-9_-]`.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        if value.is_empty() || value.len() > ROOM_ID_MAX_LEN {
            return Err(ProtocolError::InvalidMessage(format!(
                "room id must be 1-{ROOM_ID_MAX_LEN} characters, got {}",
                value.len()
            )));
        }
        if let Some(ch) = value
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-'))
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "room id contains invalid character {ch:?}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Longest client id accepted from the wire.
pub const CLIENT_ID_MAX_LEN: usize = 128;

/// Stable identifier a browser keeps across reconnects.
///
/// Only used to recognise the host: the room stores the creator's
/// `ClientId` and whoever joins with the same value becomes host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Validates and wraps a client id (1 to [`CLIENT_ID_MAX_LEN`]
    /// characters, no control characters).
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        if value.is_empty() || value.len() > CLIENT_ID_MAX_LEN {
            return Err(ProtocolError::InvalidMessage(format!(
                "client id must be 1-{CLIENT_ID_MAX_LEN} bytes, got {}",
                value.len()
            )));
        }
        if value.chars().any(char::is_control) {
            return Err(ProtocolError::InvalidMessage(
                "client id contains control characters".into(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a server event.
///
/// Room logic returns `(Recipient, ServerEvent)` pairs and the server's
/// broadcast hub resolves them to connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection currently associated with the room.
    Room(RoomId),

    /// One specific connection.
    Player(PlayerId),

    /// Every connected client, regardless of room.
    Everyone,
}
