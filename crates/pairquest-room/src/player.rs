use pairquest_protocol::{PlayerId, PlayerView};

/// A participant seated in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    /// 1-based join order; never reused within a room's lifetime.
    pub no: u32,
    pub is_host: bool,
    pub score: u32,
}

impl Player {
    pub fn new(id: PlayerId, no: u32, is_host: bool) -> Self {
        Self {
            id,
            no,
            is_host,
            score: 0,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            no: self.no,
            is_host: self.is_host,
            score: self.score,
        }
    }
}
