//! # pairquest
//!
//! Real-time backend for a turn-based multiplayer pair-matching (memory)
//! game.
//!
//! Clients connect over WebSocket, create or join a room by id, and take
//! turns flipping tiles. Every room transition is broadcast to the room;
//! usage counters are broadcast to everyone. Room configuration lives in a
//! durable key-value store so a room can be rebuilt by any instance.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pairquest::prelude::*;
//!
//! # async fn run() -> Result<(), PairQuestError> {
//! let server = PairQuestServerBuilder::new()
//!     .bind("0.0.0.0:4001")
//!     .http(Some("0.0.0.0:4002"))
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Crates
//!
//! - `pairquest-transport`: WebSocket connections
//! - `pairquest-protocol`: wire actions, events and codec
//! - `pairquest-session`: connection → room context
//! - `pairquest-room`: rooms, registry, durable store, counters

mod config;
mod error;
mod handler;
mod http;
mod hub;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::PairQuestError;
pub use http::HttpEndpoints;
pub use logging::init_logging;
pub use server::{PairQuestServer, PairQuestServerBuilder};

pub use pairquest_room::{KeyValueStore, MemoryStore, RetryPolicy, RoomRules};
#[cfg(feature = "redis")]
pub use pairquest_room::RedisStore;

/// Convenience re-exports for server setup.
pub mod prelude {
    pub use crate::{
        KeyValueStore, MemoryStore, PairQuestError, PairQuestServer, PairQuestServerBuilder,
        RetryPolicy, RoomRules, ServerConfig, init_logging,
    };
    #[cfg(feature = "redis")]
    pub use crate::RedisStore;
    pub use pairquest_protocol::{
        Action, ClientId, Outbound, PlayerId, Reply, Request, RoomId, ServerEvent,
    };
}
