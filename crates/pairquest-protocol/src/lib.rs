//! Wire protocol for pairquest.
//!
//! Everything a client and the server say to each other:
//!
//! - **Inbound**: [`Request`] wrapping one [`Action`].
//! - **Outbound**: [`Outbound`] frames carrying a [`Reply`], a
//!   [`ServerEvent`] or an error.
//! - **Identity**: [`PlayerId`], [`RoomId`], [`ClientId`] and the
//!   [`Recipient`] a room addresses its events to.
//! - **Codec**: [`Codec`] turns any of the above into bytes and back.
//!
//! This crate knows nothing about connections or rooms.

mod action;
mod codec;
mod error;
mod event;
mod types;

pub use action::{Action, Request};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{
    codes, JoinAccepted, Outbound, PlayerView, Reply, RoomView, ServerEvent,
    StatsSnapshot, StatsUpdate, TileValue,
};
pub use types::{
    ClientId, PlayerId, Recipient, RoomId, CLIENT_ID_MAX_LEN, ROOM_ID_MAX_LEN,
};
