use std::time::Duration;

use pairquest_room::{DEFAULT_ROOM_TTL, RetryPolicy, RoomRules};

/// Runtime settings for a [`PairQuestServer`](crate::PairQuestServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket listen address.
    pub bind_addr: String,
    /// HTTP info/health listen address; `None` disables the endpoints.
    pub http_addr: Option<String>,
    /// Link shown on the HTTP info page.
    pub app_url: String,
    /// A connection that sends nothing for this long is closed.
    pub connection_timeout: Duration,
    /// Lifetime of a durable room record, fixed at creation.
    pub room_ttl: Duration,
    /// Rooms with no activity for this long are evicted.
    pub idle_room_timeout: Duration,
    /// How often the idle-room reaper runs.
    pub reap_interval: Duration,
    pub retry: RetryPolicy,
    pub rules: RoomRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4001".to_string(),
            http_addr: Some("0.0.0.0:4002".to_string()),
            app_url: "#".to_string(),
            connection_timeout: Duration::from_secs(60),
            room_ttl: DEFAULT_ROOM_TTL,
            idle_room_timeout: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            rules: RoomRules::default(),
        }
    }
}
