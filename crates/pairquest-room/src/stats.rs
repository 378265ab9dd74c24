//! Usage counters: games played and share links created.

use std::sync::Arc;

use pairquest_protocol::StatsSnapshot;

use crate::{KeyValueStore, RetryPolicy, StoreError};

pub const GAMES_PLAYED_KEY: &str = "stats:gamesPlayed";
pub const LINKS_CREATED_KEY: &str = "stats:linksCreated";

/// Two monotonic counters kept in the durable store.
///
/// Increments go straight to the store's atomic `INCR` and are not retried,
/// since a retry after a lost reply would count twice. Reads are retried.
#[derive(Debug)]
pub struct UsageCounters<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: KeyValueStore> UsageCounters<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Counts a started game and returns the new total.
    pub async fn record_game_played(&self) -> Result<u64, StoreError> {
        self.store.incr(GAMES_PLAYED_KEY).await
    }

    /// Counts a created room and returns the new total.
    pub async fn record_link_created(&self) -> Result<u64, StoreError> {
        self.store.incr(LINKS_CREATED_KEY).await
    }

    /// Reads both counters. A counter that was never incremented reads 0.
    pub async fn snapshot(&self) -> Result<StatsSnapshot, StoreError> {
        Ok(StatsSnapshot {
            games_played: self.read(GAMES_PLAYED_KEY).await?,
            links_created: self.read(LINKS_CREATED_KEY).await?,
        })
    }

    async fn read(&self, key: &str) -> Result<u64, StoreError> {
        let raw = self.retry.run("read counter", || self.store.get(key)).await?;
        match raw {
            Some(raw) => raw
                .parse()
                .map_err(|_| StoreError::NotAnInteger(key.to_string())),
            None => Ok(0),
        }
    }
}
