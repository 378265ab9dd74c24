//! The session manager: every open connection and the room it sits in.
//!
//! `SessionManager` is not thread-safe by itself. The server owns it
//! behind a mutex alongside the room registry, and always locks rooms
//! before sessions.

use std::collections::{BTreeSet, HashMap};

use pairquest_protocol::{PlayerId, RoomId};

use crate::{Session, SessionError, SessionState};

/// Tracks open sessions and room membership.
///
/// ```text
/// open() ──→ [Lobby] ──attach()──→ [InRoom] ──detach()──→ [Lobby]
///                                      │
///                                      └──detach_room()──→ [Lobby]
/// close() removes the session from any state.
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,

    /// Room id → attached players, kept in sync with `sessions`.
    members: HashMap<RoomId, BTreeSet<PlayerId>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for a freshly accepted connection.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyOpen`] if the player already has one.
    pub fn open(&mut self, player_id: PlayerId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyOpen(player_id));
        }
        tracing::debug!(%player_id, "session opened");
        Ok(self
            .sessions
            .entry(player_id)
            .or_insert_with(|| Session::new(player_id)))
    }

    /// Attaches a player to a room.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if no session is open.
    /// - [`SessionError::AlreadyInRoom`] if the player is attached elsewhere
    ///   (or already here).
    pub fn attach(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        if let SessionState::InRoom(current) = &session.state {
            return Err(SessionError::AlreadyInRoom {
                player_id,
                room_id: current.clone(),
            });
        }

        self.members
            .entry(room_id.clone())
            .or_default()
            .insert(player_id);
        tracing::debug!(%player_id, %room_id, "session attached");
        session.state = SessionState::InRoom(room_id);
        Ok(())
    }

    /// Detaches a player from its room and returns the room id.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if no session is open.
    /// - [`SessionError::NotInRoom`] if the player is in the lobby.
    pub fn detach(&mut self, player_id: PlayerId) -> Result<RoomId, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        let SessionState::InRoom(room_id) =
            std::mem::replace(&mut session.state, SessionState::Lobby)
        else {
            return Err(SessionError::NotInRoom(player_id));
        };

        self.unindex(player_id, &room_id);
        tracing::debug!(%player_id, %room_id, "session detached");
        Ok(room_id)
    }

    /// Moves every session attached to `room_id` back to the lobby.
    ///
    /// Used when a room disappears with players still attached (idle
    /// eviction). Returns the players that were detached.
    pub fn detach_room(&mut self, room_id: &RoomId) -> Vec<PlayerId> {
        let players: Vec<PlayerId> = self
            .members
            .remove(room_id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for player_id in &players {
            if let Some(session) = self.sessions.get_mut(player_id) {
                session.state = SessionState::Lobby;
            }
        }
        players
    }

    /// Removes a session entirely. Returns the room it was attached to so
    /// the caller can run the departure.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session is open.
    pub fn close(&mut self, player_id: PlayerId) -> Result<Option<RoomId>, SessionError> {
        let session = self
            .sessions
            .remove(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        let room_id = match session.state {
            SessionState::InRoom(room_id) => {
                self.unindex(player_id, &room_id);
                Some(room_id)
            }
            SessionState::Lobby => None,
        };

        tracing::debug!(
            %player_id,
            connected_for = ?session.connected_at.elapsed(),
            "session closed"
        );
        Ok(room_id)
    }

    /// The room a player is attached to.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if no session is open.
    /// - [`SessionError::NotInRoom`] if the player is in the lobby.
    pub fn room_of(&self, player_id: PlayerId) -> Result<&RoomId, SessionError> {
        self.sessions
            .get(&player_id)
            .ok_or(SessionError::NotFound(player_id))?
            .room_id()
            .ok_or(SessionError::NotInRoom(player_id))
    }

    /// Players attached to a room, in ascending id order.
    pub fn players_in(&self, room_id: &RoomId) -> Vec<PlayerId> {
        self.members
            .get(room_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every open session's player id.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unindex(&mut self, player_id: PlayerId, room_id: &RoomId) {
        if let Some(set) = self.members.get_mut(room_id) {
            set.remove(&player_id);
            if set.is_empty() {
                self.members.remove(room_id);
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn manager_with(players: &[u64]) -> SessionManager {
        let mut mgr = SessionManager::new();
        for id in players {
            mgr.open(pid(*id)).unwrap();
        }
        mgr
    }

    #[test]
    fn test_open_new_player_starts_in_lobby() {
        let mut mgr = SessionManager::new();
        let session = mgr.open(pid(1)).unwrap();
        assert_eq!(session.state, SessionState::Lobby);
        assert!(session.room_id().is_none());
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_open_twice_returns_already_open() {
        let mut mgr = manager_with(&[1]);
        assert!(matches!(
            mgr.open(pid(1)),
            Err(SessionError::AlreadyOpen(p)) if p == pid(1)
        ));
    }

    #[test]
    fn test_attach_sets_room_and_indexes_member() {
        let mut mgr = manager_with(&[1, 2]);
        mgr.attach(pid(1), room("abc")).unwrap();
        mgr.attach(pid(2), room("abc")).unwrap();

        assert_eq!(mgr.room_of(pid(1)).unwrap(), &room("abc"));
        assert_eq!(mgr.players_in(&room("abc")), vec![pid(1), pid(2)]);
    }

    #[test]
    fn test_attach_while_in_room_is_rejected() {
        let mut mgr = manager_with(&[1]);
        mgr.attach(pid(1), room("abc")).unwrap();

        let err = mgr.attach(pid(1), room("xyz")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyInRoom { .. }));
        assert_eq!(mgr.room_of(pid(1)).unwrap(), &room("abc"));
        assert!(mgr.players_in(&room("xyz")).is_empty());
    }

    #[test]
    fn test_attach_unknown_player_returns_not_found() {
        let mut mgr = SessionManager::new();
        assert!(matches!(
            mgr.attach(pid(9), room("abc")),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_detach_returns_room_and_unindexes() {
        let mut mgr = manager_with(&[1]);
        mgr.attach(pid(1), room("abc")).unwrap();

        assert_eq!(mgr.detach(pid(1)).unwrap(), room("abc"));
        assert!(mgr.players_in(&room("abc")).is_empty());
        assert!(matches!(
            mgr.room_of(pid(1)),
            Err(SessionError::NotInRoom(_))
        ));
    }

    #[test]
    fn test_detach_from_lobby_returns_not_in_room() {
        let mut mgr = manager_with(&[1]);
        assert!(matches!(mgr.detach(pid(1)), Err(SessionError::NotInRoom(_))));
    }

    #[test]
    fn test_detach_room_moves_everyone_to_lobby() {
        let mut mgr = manager_with(&[1, 2, 3]);
        mgr.attach(pid(1), room("abc")).unwrap();
        mgr.attach(pid(2), room("abc")).unwrap();
        mgr.attach(pid(3), room("other")).unwrap();

        let detached = mgr.detach_room(&room("abc"));

        assert_eq!(detached, vec![pid(1), pid(2)]);
        assert_eq!(mgr.get(&pid(1)).unwrap().state, SessionState::Lobby);
        assert_eq!(mgr.players_in(&room("other")), vec![pid(3)]);
    }

    #[test]
    fn test_close_returns_attached_room() {
        let mut mgr = manager_with(&[1, 2]);
        mgr.attach(pid(1), room("abc")).unwrap();

        assert_eq!(mgr.close(pid(1)).unwrap(), Some(room("abc")));
        assert_eq!(mgr.close(pid(2)).unwrap(), None);
        assert!(mgr.is_empty());
        assert!(mgr.players_in(&room("abc")).is_empty());
    }

    #[test]
    fn test_close_unknown_player_returns_not_found() {
        let mut mgr = SessionManager::new();
        assert!(matches!(mgr.close(pid(1)), Err(SessionError::NotFound(_))));
    }
}
