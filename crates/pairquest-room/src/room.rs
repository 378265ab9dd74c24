//! The room state machine.
//!
//! A [`Room`] owns the roster, the board, the turn pointer and the flip
//! buffer, and encodes every game rule. It does no I/O: each operation
//! mutates the room and returns the room-scoped events that describe the
//! change, in the order clients must see them. The registry wraps those
//! events with a recipient and persists what needs persisting.
//!
//! ```text
//! [Open] ──join×capacity / start──→ [Started] ──last pair──→ [Ended]
//!                                       ↑                       │
//!                                       └────────restart────────┘
//! ```
//!
//! A room is torn down by the registry when its roster becomes empty.

use pairquest_protocol::{
    ClientId, JoinAccepted, PlayerId, PlayerView, RoomId, RoomView, ServerEvent,
    TileValue,
};
use tokio::time::{Duration, Instant};

use crate::{generate_board, Player, RoomError, RoomPhase, RoomRules, RoomSettings};

/// The result of an accepted join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Acknowledgement for the joining player.
    pub accepted: JoinAccepted,
    /// Room broadcasts: the new roster, then the start event if the join
    /// filled the room.
    pub events: Vec<ServerEvent>,
    /// The join filled the room and started the game.
    pub started: bool,
}

/// One game instance.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    settings: RoomSettings,
    rules: RoomRules,

    /// Join order. Never longer than `settings.capacity`.
    players: Vec<Player>,
    board: Vec<TileValue>,

    /// Index into `players`; valid whenever `players` is non-empty.
    turn: usize,

    /// Distinct face-up tile indices awaiting evaluation (0, 1 or 2;
    /// evaluated and cleared as soon as it reaches 2).
    flipped: Vec<usize>,

    /// Matched tile indices, in match order.
    opened: Vec<usize>,

    started: bool,
    /// Set together with `started` and never cleared.
    closed: bool,
    /// The current game's `game_over` has been emitted.
    finished: bool,

    last_activity: Instant,
}

impl Room {
    /// Creates an empty, open room with a fresh board.
    ///
    /// Recovery from a durable record goes through here as well, so a
    /// recovered room is indistinguishable from a new one.
    pub fn new(id: RoomId, settings: RoomSettings, rules: RoomRules) -> Self {
        let board = generate_board(settings.grid_size, settings.theme);
        Self {
            id,
            settings,
            rules,
            players: Vec::new(),
            board,
            turn: 0,
            flipped: Vec::new(),
            opened: Vec::new(),
            started: false,
            closed: false,
            finished: false,
            last_activity: Instant::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Seats a player.
    ///
    /// Returns `None` without touching the room when it is closed, full,
    /// or the player is already seated. The host flag comes from comparing
    /// `client_id` with the configured host, never from the client.
    pub fn join(&mut self, player_id: PlayerId, client_id: &ClientId) -> Option<JoinOutcome> {
        if !self.phase().is_joinable() || self.is_full() || self.contains(player_id) {
            tracing::debug!(
                room_id = %self.id,
                %player_id,
                phase = %self.phase(),
                players = self.players.len(),
                "join rejected"
            );
            return None;
        }

        let no = self.players.last().map_or(1, |p| p.no + 1);
        let is_host = *client_id == self.settings.host_client_id;
        let player = Player::new(player_id, no, is_host);
        let view = player.view();
        self.players.push(player);
        self.touch();

        tracing::info!(
            room_id = %self.id,
            %player_id,
            no,
            is_host,
            players = self.players.len(),
            "player joined"
        );

        let players = self.player_views();
        let accepted = JoinAccepted {
            player: view,
            players: players.clone(),
            room: self.room_view(),
        };
        let mut events = vec![ServerEvent::UpdatePlayers(players)];

        let started = self.is_full();
        if started {
            events.extend(self.start_game());
        }

        Some(JoinOutcome {
            accepted,
            events,
            started,
        })
    }

    /// Starts a game on request, before the room is full.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if the requester is not seated.
    /// - [`RoomError::NotHost`] under host-only controls.
    pub fn start(&mut self, requester: PlayerId) -> Result<Vec<ServerEvent>, RoomError> {
        self.check_member(requester)?;
        self.check_host(requester)?;
        Ok(self.start_game())
    }

    /// Deals a new board and closes the room to joins.
    ///
    /// Scores reset and the first seat takes the first turn.
    pub fn start_game(&mut self) -> Vec<ServerEvent> {
        self.deal();
        self.started = true;
        self.closed = true;

        tracing::info!(
            room_id = %self.id,
            players = self.players.len(),
            tiles = self.board.len(),
            "game started"
        );

        vec![ServerEvent::StartGame {
            board_items: self.board.clone(),
            next_player: self.turn_holder(),
        }]
    }

    /// Flips a tile.
    ///
    /// Re-flipping a tile already in the buffer is a no-op that still
    /// rebroadcasts the buffer. When two distinct tiles are face up they
    /// are compared: a match opens both and scores the requester without
    /// moving the turn; a miss clears the buffer and advances the turn.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if the requester is not seated.
    /// - [`RoomError::InvalidMove`] before the game starts, after it ends,
    ///   or for an out-of-range or already-matched tile.
    /// - [`RoomError::NotYourTurn`] under turn enforcement.
    pub fn play(
        &mut self,
        index: usize,
        requester: PlayerId,
    ) -> Result<Vec<ServerEvent>, RoomError> {
        self.check_member(requester)?;
        if !self.started {
            return Err(RoomError::InvalidMove("game has not started".into()));
        }
        if self.finished {
            return Err(RoomError::InvalidMove("game is over".into()));
        }
        if index >= self.board.len() {
            return Err(RoomError::InvalidMove(format!(
                "tile {index} is off the board ({} tiles)",
                self.board.len()
            )));
        }
        if self.opened.contains(&index) {
            return Err(RoomError::InvalidMove(format!(
                "tile {index} is already matched"
            )));
        }
        if self.rules.enforce_turns && self.turn_holder() != Some(requester) {
            return Err(RoomError::NotYourTurn(requester));
        }

        self.touch();
        if !self.flipped.contains(&index) {
            self.flipped.push(index);
        }
        let mut events = vec![ServerEvent::UpdateFlippedPair(self.flipped.clone())];

        if let [first, second] = self.flipped[..] {
            self.flipped.clear();
            if self.board[first] == self.board[second] {
                self.opened.extend([first, second]);
                if let Some(player) = self.players.iter_mut().find(|p| p.id == requester) {
                    player.score += 1;
                }
                events.push(ServerEvent::MatchFound {
                    opened: self.opened.clone(),
                    flipped_pair: Vec::new(),
                    players: self.player_views(),
                });

                if self.opened.len() == self.board.len() {
                    self.finished = true;
                    tracing::info!(room_id = %self.id, "game over");
                    events.push(ServerEvent::GameOver);
                }
            } else {
                self.advance_turn();
                events.push(ServerEvent::NoMatch {
                    flipped_pair: Vec::new(),
                    next_player: self.turn_holder(),
                });
            }
        }

        Ok(events)
    }

    /// Deals a fresh board to the same roster.
    ///
    /// # Errors
    /// - [`RoomError::NotInRoom`] if the requester is not seated.
    /// - [`RoomError::NotHost`] under host-only controls.
    /// - [`RoomError::InvalidMove`] if no game has started yet.
    pub fn restart(&mut self, requester: PlayerId) -> Result<Vec<ServerEvent>, RoomError> {
        self.check_member(requester)?;
        self.check_host(requester)?;
        if !self.started {
            return Err(RoomError::InvalidMove("game has not started".into()));
        }

        self.deal();
        tracing::info!(room_id = %self.id, "game restarted");

        Ok(vec![ServerEvent::Restart {
            board_items: self.board.clone(),
            next_player: self.turn_holder(),
            players: self.player_views(),
        }])
    }

    /// Broadcasts `game_over` on a member's request. Game state is left
    /// as it is.
    ///
    /// # Errors
    /// Returns [`RoomError::NotInRoom`] if the requester is not seated.
    pub fn game_over(&mut self, requester: PlayerId) -> Result<Vec<ServerEvent>, RoomError> {
        self.check_member(requester)?;
        self.touch();
        Ok(vec![ServerEvent::GameOver])
    }

    /// Removes a player.
    ///
    /// Returns `None` if the player was not seated. When the leaver held
    /// the turn during a game, the turn moves on exactly as after a miss,
    /// counted from the leaver's old seat over the shortened roster, and
    /// the new holder is announced. The room stays closed.
    pub fn leave(&mut self, player_id: PlayerId) -> Option<Vec<ServerEvent>> {
        let seat = self.players.iter().position(|p| p.id == player_id)?;
        let removed = self.players.remove(seat);
        self.touch();

        tracing::info!(
            room_id = %self.id,
            %player_id,
            players = self.players.len(),
            "player left"
        );

        let mut events = vec![
            ServerEvent::PlayerLeft(removed.view()),
            ServerEvent::UpdatePlayers(self.player_views()),
        ];

        if self.players.is_empty() {
            self.turn = 0;
            return Some(events);
        }

        if self.started && seat == self.turn {
            self.advance_turn();
            if let Some(next) = self.turn_holder() {
                events.push(ServerEvent::NextPlayer(next));
            }
        } else if seat < self.turn {
            self.turn -= 1;
        }

        Some(events)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn rules(&self) -> RoomRules {
        self.rules
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.capacity
    }

    pub fn board(&self) -> &[TileValue] {
        &self.board
    }

    pub fn flipped(&self) -> &[usize] {
        &self.flipped
    }

    pub fn opened(&self) -> &[usize] {
        &self.opened
    }

    /// Roster index of the turn holder.
    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn turn_holder(&self) -> Option<PlayerId> {
        self.players.get(self.turn).map(|p| p.id)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn phase(&self) -> RoomPhase {
        match (self.started, self.finished) {
            (false, _) => RoomPhase::Open,
            (true, false) => RoomPhase::Started,
            (true, true) => RoomPhase::Ended,
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// How long the room has gone without an operation.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    pub fn room_view(&self) -> RoomView {
        RoomView {
            theme: self.settings.theme.to_string(),
            room_size: self.settings.capacity,
            grid_size: self.settings.grid_size,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn deal(&mut self) {
        self.board = generate_board(self.settings.grid_size, self.settings.theme);
        self.turn = 0;
        self.flipped.clear();
        self.opened.clear();
        self.finished = false;
        for player in &mut self.players {
            player.score = 0;
        }
        self.touch();
    }

    /// Moves the turn to the next seat, wrapping past the last one.
    fn advance_turn(&mut self) {
        self.turn = if self.turn + 1 >= self.players.len() {
            0
        } else {
            self.turn + 1
        };
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn check_member(&self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.contains(player_id) {
            Ok(())
        } else {
            Err(RoomError::NotInRoom(player_id, self.id.clone()))
        }
    }

    fn check_host(&self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.rules.host_only_controls {
            return Ok(());
        }
        match self.player(player_id) {
            Some(player) if player.is_host => Ok(()),
            _ => Err(RoomError::NotHost(player_id)),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
