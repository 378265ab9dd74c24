//! Session layer for pairquest.
//!
//! A session is the server-side context of one live connection: which
//! player it is and which room (if any) it currently belongs to. Room
//! handlers take that room id from here instead of trusting the client
//! to repeat it, and the broadcast hub asks here who is in a room.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionState};
