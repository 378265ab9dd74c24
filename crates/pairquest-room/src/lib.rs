//! Room layer for pairquest.
//!
//! - [`Room`]: the game state machine (join, start, play, restart, leave).
//! - [`RoomRegistry`]: owns resident rooms, recovers them from their
//!   durable [`RoomRecord`], and reaps idle ones.
//! - [`KeyValueStore`]: the durable store seam, with [`MemoryStore`] and,
//!   behind the `redis` feature, `RedisStore`.
//! - [`UsageCounters`]: games played and links created.

#![allow(async_fn_in_trait)]

mod board;
mod config;
mod error;
mod player;
mod record;
#[cfg(feature = "redis")]
mod redis_store;
mod registry;
mod retry;
mod room;
mod stats;
mod store;

pub use board::{generate_board, Theme};
pub use config::{
    RoomPhase, RoomRules, RoomSettings, MAX_CAPACITY, MIN_CAPACITY, MIN_GRID_SIZE,
};
pub use error::{RoomError, StoreError};
pub use player::Player;
pub use record::{RoomRecord, RoomRecords, DEFAULT_ROOM_TTL, ROOM_RECORD_VERSION};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use registry::{Outbox, RoomRegistry, ROOM_ID_LEN};
pub use retry::RetryPolicy;
pub use room::{JoinOutcome, Room};
pub use stats::{UsageCounters, GAMES_PLAYED_KEY, LINKS_CREATED_KEY};
pub use store::{KeyValueStore, MemoryStore};
