//! The durable key-value seam and its in-memory implementation.
//!
//! Rooms survive a restart (or move between processes) through a small
//! record kept in an external key-value store. [`KeyValueStore`] is the
//! four commands that requires; [`MemoryStore`] implements them in-process
//! for tests and single-node deployments, and `RedisStore` (feature
//! `redis`) talks to a real server.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant};

use crate::StoreError;

/// The commands the room layer needs from a durable store.
///
/// Implementations must be cheap to clone or be shared behind an `Arc`;
/// the registry holds one for its whole lifetime.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Writes `value` under `key`, expiring after `ttl`. Overwrites and
    /// resets the expiry of any existing value.
    fn set_ex(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reads the value under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Deletes `key`. Returns whether something was deleted.
    fn del(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically increments the integer under `key` (missing counts as 0)
    /// and returns the new value. Counters never expire.
    fn incr(&self, key: &str) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn set_ex(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set_ex(key, value, ttl)
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
        (**self).get(key)
    }

    fn del(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).del(key)
    }

    fn incr(&self, key: &str) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).incr(key)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process [`KeyValueStore`].
///
/// Expiry uses `tokio::time`, so paused-clock tests can advance past a TTL.
/// Expired entries are dropped lazily when touched. Clones share the same
/// map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|map| map.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: Some(Instant::now() + ttl),
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut map = self.lock()?;
        if let Some(entry) = map.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
            map.remove(key);
        }
        Ok(None)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .lock()?
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut map = self.lock()?;
        let current = match map.get(key) {
            Some(entry) if entry.is_live(now) => entry
                .value
                .parse::<u64>()
                .map_err(|_| StoreError::NotAnInteger(key.to_string()))?,
            _ => 0,
        };
        let next = current + 1;
        map.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }
}
