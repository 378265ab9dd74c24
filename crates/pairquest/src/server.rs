use std::net::SocketAddr;
use std::sync::Arc;

use pairquest_protocol::{Codec, JsonCodec, Outbound, PlayerId, ServerEvent};
use pairquest_room::{KeyValueStore, Outbox, RoomRegistry};
use pairquest_session::SessionManager;
use pairquest_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::PairQuestError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::http::HttpEndpoints;
use crate::hub::Hub;

/// Shared server state passed to each connection handler task.
///
/// Locks are always taken in field order: `rooms`, then `sessions`, then
/// `hub`. Room transitions and their fan-out happen under the `rooms`
/// lock, so every client sees a room's events in transition order.
pub(crate) struct ServerState<S, C> {
    pub(crate) rooms: Mutex<RoomRegistry<S>>,
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) hub: Mutex<Hub>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

impl<S: KeyValueStore, C: Codec> ServerState<S, C> {
    /// Queues an optional direct reply for `player_id`, then fans out `out`.
    pub(crate) async fn deliver(
        &self,
        sessions: &SessionManager,
        player_id: PlayerId,
        reply: Option<Outbound>,
        out: Outbox,
    ) {
        let hub = self.hub.lock().await;
        if let Some(frame) = reply {
            hub.send_to(player_id, frame);
        }
        hub.dispatch(sessions, out);
    }

    /// Queues a frame for one player only.
    pub(crate) async fn reply(&self, player_id: PlayerId, frame: Outbound) {
        self.hub.lock().await.send_to(player_id, frame);
    }

    /// Evicts idle rooms and moves any sessions still pointing at them back
    /// to the lobby, telling each of those players with `room_closed`.
    /// Returns the number of rooms evicted.
    pub(crate) async fn reap_idle_rooms(&self) -> usize {
        let mut rooms = self.rooms.lock().await;
        let evicted = rooms.evict_idle(self.config.idle_room_timeout).await;
        if evicted.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.lock().await;
        let hub = self.hub.lock().await;
        for room_id in &evicted {
            let detached = sessions.detach_room(room_id);
            for &player_id in &detached {
                hub.send_to(
                    player_id,
                    Outbound::Event(ServerEvent::RoomClosed(room_id.clone())),
                );
            }
            tracing::info!(%room_id, detached = detached.len(), "idle room reaped");
        }
        evicted.len()
    }
}

/// Builder for configuring and starting a pairquest server.
///
/// # Example
///
/// ```rust,no_run
/// use pairquest::{MemoryStore, PairQuestServerBuilder};
///
/// # async fn run() -> Result<(), pairquest::PairQuestError> {
/// let server = PairQuestServerBuilder::new()
///     .bind("0.0.0.0:4001")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PairQuestServerBuilder {
    config: ServerConfig,
}

impl PairQuestServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration. Call before `bind`/`http`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP listen address; `None` disables the endpoints.
    pub fn http(mut self, addr: Option<&str>) -> Self {
        self.config.http_addr = addr.map(str::to_string);
        self
    }

    /// Binds the listeners and assembles the server around `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<S: KeyValueStore>(
        self,
        store: S,
    ) -> Result<PairQuestServer<S, JsonCodec>, PairQuestError> {
        let config = self.config;
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;
        let http = match &config.http_addr {
            Some(addr) => Some(HttpEndpoints::start(addr, &config.app_url)?),
            None => None,
        };

        let rooms = RoomRegistry::new(
            Arc::new(store),
            config.rules,
            config.retry.clone(),
            config.room_ttl,
        );
        let state = Arc::new(ServerState {
            rooms: Mutex::new(rooms),
            sessions: Mutex::new(SessionManager::new()),
            hub: Mutex::new(Hub::default()),
            codec: JsonCodec,
            config,
        });

        Ok(PairQuestServer {
            transport,
            http,
            state,
        })
    }
}

impl Default for PairQuestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound pairquest server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PairQuestServer<S, C> {
    transport: WebSocketTransport,
    http: Option<HttpEndpoints>,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> PairQuestServer<S, C>
where
    S: KeyValueStore,
    C: Codec + Clone,
{
    /// Returns the address the WebSocket listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, PairQuestError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns the address of the HTTP endpoints, if enabled.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().map(HttpEndpoints::local_addr)
    }

    /// Runs the idle-room reaper and the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PairQuestError> {
        tracing::info!(
            addr = %self.transport.local_addr()?,
            idle_room_timeout = ?self.state.config.idle_room_timeout,
            "pairquest server running"
        );

        tokio::spawn(reap_loop(Arc::clone(&self.state)));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn reap_loop<S: KeyValueStore, C: Codec>(state: Arc<ServerState<S, C>>) {
    let mut ticker = tokio::time::interval(state.config.reap_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        state.reap_idle_rooms().await;
    }
}
