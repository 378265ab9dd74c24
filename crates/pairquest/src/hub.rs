//! Fan-out of outbound frames to connected peers.

use std::collections::HashMap;

use pairquest_protocol::{Outbound, PlayerId, Recipient};
use pairquest_room::Outbox;
use pairquest_session::SessionManager;
use tokio::sync::mpsc::UnboundedSender;

/// Write queues of every connected peer.
///
/// Each connection registers the sending half of its writer queue; pushing
/// a frame never blocks, so the hub can be driven while room and session
/// locks are held. That keeps frames for one room in transition order.
#[derive(Debug, Default)]
pub(crate) struct Hub {
    peers: HashMap<PlayerId, UnboundedSender<Outbound>>,
}

impl Hub {
    pub(crate) fn register(&mut self, player_id: PlayerId, tx: UnboundedSender<Outbound>) {
        self.peers.insert(player_id, tx);
    }

    /// Drops the peer's queue; its writer drains and exits.
    pub(crate) fn unregister(&mut self, player_id: PlayerId) {
        self.peers.remove(&player_id);
    }

    /// Queues one frame for one peer. Returns `false` if the peer is gone.
    pub(crate) fn send_to(&self, player_id: PlayerId, frame: Outbound) -> bool {
        match self.peers.get(&player_id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Delivers every event in `out` to its recipients, in order.
    ///
    /// Room recipients are resolved through the session context, so only
    /// players currently attached to the room receive its events.
    pub(crate) fn dispatch(&self, sessions: &SessionManager, out: Outbox) {
        for (recipient, event) in out {
            match recipient {
                Recipient::Room(room_id) => {
                    for player_id in sessions.players_in(&room_id) {
                        self.send_to(player_id, Outbound::Event(event.clone()));
                    }
                }
                Recipient::Player(player_id) => {
                    self.send_to(player_id, Outbound::Event(event));
                }
                Recipient::Everyone => {
                    for tx in self.peers.values() {
                        let _ = tx.send(Outbound::Event(event.clone()));
                    }
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.peers.len()
    }
}
