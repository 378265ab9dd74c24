//! The room registry: every room resident in this process.
//!
//! The registry is the only owner of [`Room`]s. It resolves room ids
//! (falling back to the durable record on a miss), runs room operations,
//! tags the resulting events with their recipients, and keeps the durable
//! record and usage counters in step with room lifecycle transitions.
//!
//! Operations append to an [`Outbox`] rather than returning events so a
//! handler can collect room broadcasts and global counter updates from a
//! single call and fan them out afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use pairquest_protocol::{
    ClientId, JoinAccepted, PlayerId, Recipient, RoomId, ServerEvent, StatsSnapshot,
    StatsUpdate,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::time::{Duration, Instant};

use crate::{
    KeyValueStore, RetryPolicy, Room, RoomError, RoomRecord, RoomRecords, RoomRules,
    RoomSettings, UsageCounters,
};

/// Events produced by a registry call, with their recipients, in order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

/// Length of generated room ids.
pub const ROOM_ID_LEN: usize = 9;

/// Owns all resident rooms and their durable side effects.
///
/// ## Lifecycle
///
/// ```text
/// create_room() ──→ [resident] ──leave() empties──→ teardown
///                       ↑                              │
///  join_room() miss ──→ recover from record            └─ delete record iff started
///                       │
///                  evict_idle() ──→ teardown
/// ```
#[derive(Debug)]
pub struct RoomRegistry<S> {
    rooms: HashMap<RoomId, Room>,
    records: RoomRecords<S>,
    counters: UsageCounters<S>,
    rules: RoomRules,
}

impl<S: KeyValueStore> RoomRegistry<S> {
    pub fn new(store: Arc<S>, rules: RoomRules, retry: RetryPolicy, room_ttl: Duration) -> Self {
        Self {
            rooms: HashMap::new(),
            records: RoomRecords::new(Arc::clone(&store), retry.clone(), room_ttl),
            counters: UsageCounters::new(store, retry),
            rules,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Creates a room and persists its record.
    ///
    /// The record is written before the room becomes resident, so a store
    /// failure leaves nothing behind. On success the links-created counter
    /// is bumped and broadcast to everyone.
    ///
    /// # Errors
    /// - [`RoomError::InvalidSettings`] if the settings do not validate.
    /// - [`RoomError::Store`] if the record cannot be written.
    pub async fn create_room(
        &mut self,
        settings: RoomSettings,
        out: &mut Outbox,
    ) -> Result<RoomId, RoomError> {
        settings.validate()?;

        let id = self.fresh_id();
        self.records.save(&RoomRecord::new(id.clone(), &settings)).await?;

        tracing::info!(
            room_id = %id,
            theme = %settings.theme,
            capacity = settings.capacity,
            grid_size = settings.grid_size,
            "room created"
        );
        self.rooms
            .insert(id.clone(), Room::new(id.clone(), settings, self.rules));

        match self.counters.record_link_created().await {
            Ok(total) => out.push((
                Recipient::Everyone,
                ServerEvent::Stats(StatsUpdate {
                    links_created: Some(total),
                    ..StatsUpdate::default()
                }),
            )),
            Err(err) => tracing::warn!(error = %err, "failed to count created link"),
        }

        Ok(id)
    }

    /// Resolves a room id to a resident room, rebuilding it from its
    /// durable record on a miss.
    ///
    /// A rebuilt room has the stored id and settings, an empty roster and
    /// a fresh board. Returns `Ok(None)` if there is no live record.
    ///
    /// # Errors
    /// Returns [`RoomError::Store`] if the record cannot be read, cannot be
    /// parsed, or holds settings outside the room limits.
    pub async fn resolve(&mut self, id: &RoomId) -> Result<Option<&mut Room>, RoomError> {
        if !self.rooms.contains_key(id) {
            let Some(record) = self.records.load(id).await? else {
                tracing::debug!(room_id = %id, "room not found");
                return Ok(None);
            };
            tracing::info!(room_id = %id, version = record.version, "room recovered");
            self.rooms
                .insert(id.clone(), Room::new(id.clone(), record.settings(), self.rules));
        }
        Ok(self.rooms.get_mut(id))
    }

    /// Seats a player in a room, recovering the room if needed.
    ///
    /// Returns `Ok(None)` when the room is unknown, closed, full, or the
    /// player is already seated. A join that fills the room starts the game
    /// and bumps the games-played counter.
    ///
    /// # Errors
    /// Returns [`RoomError::Store`] if recovery fails.
    pub async fn join_room(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        client_id: &ClientId,
        out: &mut Outbox,
    ) -> Result<Option<JoinAccepted>, RoomError> {
        let Some(room) = self.resolve(id).await? else {
            return Ok(None);
        };
        let Some(outcome) = room.join(player_id, client_id) else {
            return Ok(None);
        };

        push_room_events(out, id, outcome.events);
        if outcome.started {
            self.count_game(out).await;
        }
        Ok(Some(outcome.accepted))
    }

    /// Flips a tile in a resident room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room is not resident.
    /// - Any error from [`Room::play`].
    pub fn play(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        index: usize,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        let events = self.room_mut(id)?.play(index, player_id)?;
        push_room_events(out, id, events);
        Ok(())
    }

    /// Starts the game before the room is full.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room is not resident.
    /// - Any error from [`Room::start`].
    pub async fn start(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        let events = self.room_mut(id)?.start(player_id)?;
        push_room_events(out, id, events);
        self.count_game(out).await;
        Ok(())
    }

    /// Deals a fresh board to the same roster.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room is not resident.
    /// - Any error from [`Room::restart`].
    pub fn restart(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        let events = self.room_mut(id)?.restart(player_id)?;
        push_room_events(out, id, events);
        Ok(())
    }

    /// Broadcasts a forced `game_over`.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room is not resident.
    /// - [`RoomError::NotInRoom`] if the player is not seated.
    pub fn game_over(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        let events = self.room_mut(id)?.game_over(player_id)?;
        push_room_events(out, id, events);
        Ok(())
    }

    /// Removes a player. Tears the room down when it empties.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if the room is not resident.
    /// - [`RoomError::NotInRoom`] if the player is not seated.
    pub async fn leave(
        &mut self,
        id: &RoomId,
        player_id: PlayerId,
        out: &mut Outbox,
    ) -> Result<(), RoomError> {
        let room = self.room_mut(id)?;
        let events = room
            .leave(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id, id.clone()))?;
        let empty = room.is_empty();

        push_room_events(out, id, events);
        if empty {
            self.teardown(id, "empty").await;
        }
        Ok(())
    }

    /// Tears down every room idle for at least `max_idle`. Returns the
    /// evicted ids so the caller can detach sessions still pointing at them.
    pub async fn evict_idle(&mut self, max_idle: Duration) -> Vec<RoomId> {
        let now = Instant::now();
        let idle: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.idle_for(now) >= max_idle)
            .map(|room| room.id().clone())
            .collect();

        for id in &idle {
            self.teardown(id, "idle").await;
        }
        idle
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Reads both usage counters.
    ///
    /// # Errors
    /// Returns [`RoomError::Store`] if the store cannot be read.
    pub async fn stats(&self) -> Result<StatsSnapshot, RoomError> {
        Ok(self.counters.snapshot().await?)
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn rules(&self) -> RoomRules {
        self.rules
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn room_mut(&mut self, id: &RoomId) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))
    }

    /// Removes a room. Its durable record is deleted only if a game was
    /// started; an unstarted room's record is left to expire so the share
    /// link keeps working.
    async fn teardown(&mut self, id: &RoomId, reason: &'static str) {
        let Some(room) = self.rooms.remove(id) else {
            return;
        };
        let started = room.is_started();
        tracing::info!(
            room_id = %id,
            reason,
            started,
            players = room.players().len(),
            "room torn down"
        );

        if started {
            if let Err(err) = self.records.delete(id).await {
                tracing::warn!(room_id = %id, error = %err, "failed to delete room record");
            }
        }
    }

    async fn count_game(&self, out: &mut Outbox) {
        match self.counters.record_game_played().await {
            Ok(total) => out.push((
                Recipient::Everyone,
                ServerEvent::Stats(StatsUpdate {
                    games_played: Some(total),
                    ..StatsUpdate::default()
                }),
            )),
            Err(err) => tracing::warn!(error = %err, "failed to count played game"),
        }
    }

    fn fresh_id(&self) -> RoomId {
        loop {
            let candidate: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(ROOM_ID_LEN)
                .map(char::from)
                .collect();
            if let Ok(id) = RoomId::parse(&candidate) {
                if !self.rooms.contains_key(&id) {
                    return id;
                }
            }
        }
    }
}

fn push_room_events(out: &mut Outbox, id: &RoomId, events: Vec<ServerEvent>) {
    out.extend(
        events
            .into_iter()
            .map(|event| (Recipient::Room(id.clone()), event)),
    );
}
