//! The durable room record: just enough to rebuild a room elsewhere.
//!
//! Stored as JSON under `room:<id>` with a fixed TTL set at creation.
//! Play state is never stored; a room rebuilt from its record starts over
//! with an empty roster and a fresh board.

use std::sync::Arc;

use pairquest_protocol::{ClientId, RoomId};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::{KeyValueStore, RetryPolicy, RoomSettings, StoreError, Theme};

/// Schema version written by this build.
pub const ROOM_RECORD_VERSION: u32 = 1;

/// Default lifetime of a room record.
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(900);

fn unversioned() -> u32 {
    1
}

/// Versioned configuration of one room.
///
/// ```json
/// {"version":1,"id":"aZ3kLm9Qx","theme":"icons","numOfPlayers":2,
///  "gridSize":16,"hostClientId":"c-1"}
/// ```
///
/// Records written before versioning have no `version` field and read
/// as version 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    #[serde(default = "unversioned")]
    pub version: u32,
    pub id: RoomId,
    pub theme: Theme,
    pub num_of_players: usize,
    pub grid_size: usize,
    pub host_client_id: ClientId,
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default = "unversioned")]
    version: u32,
}

impl RoomRecord {
    pub fn new(id: RoomId, settings: &RoomSettings) -> Self {
        Self {
            version: ROOM_RECORD_VERSION,
            id,
            theme: settings.theme,
            num_of_players: settings.capacity,
            grid_size: settings.grid_size,
            host_client_id: settings.host_client_id.clone(),
        }
    }

    /// Store key for a room.
    pub fn key(id: &RoomId) -> String {
        format!("room:{id}")
    }

    pub fn settings(&self) -> RoomSettings {
        RoomSettings {
            capacity: self.num_of_players,
            grid_size: self.grid_size,
            theme: self.theme,
            host_client_id: self.host_client_id.clone(),
        }
    }

    /// Parses a stored record.
    ///
    /// # Errors
    /// - [`StoreError::UnsupportedVersion`] for records newer than
    ///   [`ROOM_RECORD_VERSION`], checked before the body is parsed.
    /// - [`StoreError::Corrupt`] for anything that is not a valid record.
    /// - [`StoreError::InvalidRecord`] when the stored settings fail
    ///   [`RoomSettings::validate`].
    pub fn decode(key: &str, raw: &str) -> Result<Self, StoreError> {
        let corrupt = |source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        };
        let probe: VersionProbe = serde_json::from_str(raw).map_err(corrupt)?;
        if probe.version > ROOM_RECORD_VERSION {
            return Err(StoreError::UnsupportedVersion(probe.version));
        }
        let record: Self = serde_json::from_str(raw).map_err(corrupt)?;
        record
            .settings()
            .validate()
            .map_err(|err| StoreError::InvalidRecord {
                key: key.to_string(),
                reason: err.to_string(),
            })?;
        Ok(record)
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|source| StoreError::Corrupt {
            key: Self::key(&self.id),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// RoomRecords
// ---------------------------------------------------------------------------

/// Reads and writes room records, retrying when the store is unavailable.
#[derive(Debug)]
pub struct RoomRecords<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    ttl: Duration,
}

impl<S: KeyValueStore> RoomRecords<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy, ttl: Duration) -> Self {
        Self { store, retry, ttl }
    }

    /// Writes a record with the configured TTL.
    pub async fn save(&self, record: &RoomRecord) -> Result<(), StoreError> {
        let key = RoomRecord::key(&record.id);
        let value = record.encode()?;
        self.retry
            .run("save room record", || self.store.set_ex(&key, value.clone(), self.ttl))
            .await
    }

    /// Reads a record; `None` if absent or expired.
    pub async fn load(&self, id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
        let key = RoomRecord::key(id);
        let raw = self
            .retry
            .run("load room record", || self.store.get(&key))
            .await?;
        raw.map(|raw| RoomRecord::decode(&key, &raw)).transpose()
    }

    /// Deletes a record. Returns whether one existed.
    pub async fn delete(&self, id: &RoomId) -> Result<bool, StoreError> {
        let key = RoomRecord::key(id);
        self.retry
            .run("delete room record", || self.store.del(&key))
            .await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
