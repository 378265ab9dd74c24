use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pairquest_protocol::{Action, Codec, Outbound, PlayerId, Reply, Request, RoomId};
use pairquest_room::{KeyValueStore, Outbox, RoomError, RoomRegistry, RoomSettings};
use pairquest_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::PairQuestError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
///
/// The connection id becomes the player id. Frames for this player are
/// queued through the hub and written by a dedicated writer task, so a
/// broadcast never waits on this player's read loop.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), PairQuestError>
where
    S: KeyValueStore,
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let player_id = PlayerId(conn.id().into_inner());

    state.sessions.lock().await.open(player_id)?;
    let (tx, rx) = mpsc::unbounded_channel();
    {
        let mut hub = state.hub.lock().await;
        hub.register(player_id, tx);
        tracing::info!(%player_id, peers = hub.len(), "player connected");
    }

    let writer = tokio::spawn(write_frames(
        Arc::clone(&conn),
        rx,
        state.codec.clone(),
    ));

    let result = read_frames(&conn, &state, player_id).await;

    disconnect(&state, player_id).await;
    // the hub dropped our queue; the writer flushes what is left and exits
    let _ = writer.await;
    let _ = conn.close().await;
    tracing::info!(%player_id, "player disconnected");

    result
}

/// Drains the player's queue onto the socket.
async fn write_frames<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: UnboundedReceiver<Outbound>,
    codec: C,
) {
    while let Some(frame) = rx.recv().await {
        let bytes = match codec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}

/// Reads and executes requests until the peer closes, errors, or goes
/// quiet for longer than the connection timeout.
async fn read_frames<S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<S, C>,
    player_id: PlayerId,
) -> Result<(), PairQuestError>
where
    S: KeyValueStore,
    C: Codec,
{
    loop {
        let data = match tokio::time::timeout(state.config.connection_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%player_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                return Ok(());
            }
        };

        let request: Request = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode request");
                let err = PairQuestError::from(e);
                state
                    .reply(player_id, Outbound::error(None, err.code(), err.to_string()))
                    .await;
                continue;
            }
        };

        let ack = request.ack;
        let name = request.action.name();
        tracing::trace!(%player_id, action = name, ?ack, "request");

        if let Err(err) = execute(state, player_id, ack, request.action).await {
            tracing::debug!(%player_id, action = name, error = %err, "request rejected");
            state
                .reply(player_id, Outbound::error(ack, err.code(), err.to_string()))
                .await;
        }
    }
}

/// The dispatch table: one arm per inbound action.
///
/// Every arm that touches a room holds the `rooms` lock until its events
/// are queued.
async fn execute<S, C>(
    state: &ServerState<S, C>,
    player_id: PlayerId,
    ack: Option<u64>,
    action: Action,
) -> Result<(), PairQuestError>
where
    S: KeyValueStore,
    C: Codec,
{
    let mut out = Outbox::new();

    match action {
        Action::CreateRoom {
            num_of_players,
            grid_size,
            theme,
            host_client_id,
        } => {
            let settings = RoomSettings {
                capacity: num_of_players,
                grid_size,
                theme: theme.parse()?,
                host_client_id,
            };
            let mut rooms = state.rooms.lock().await;
            let room_id = rooms.create_room(settings, &mut out).await?;
            let sessions = state.sessions.lock().await;
            let reply = Outbound::Ack {
                ack,
                reply: Reply::RoomCreated(room_id),
            };
            state.deliver(&sessions, player_id, Some(reply), out).await;
        }

        Action::JoinRoom { room_id, client_id } => {
            let mut rooms = state.rooms.lock().await;
            let mut sessions = state.sessions.lock().await;
            let accepted = if sessions.room_of(player_id).is_ok() {
                tracing::debug!(%player_id, %room_id, "join while seated elsewhere");
                None
            } else {
                rooms
                    .join_room(&room_id, player_id, &client_id, &mut out)
                    .await?
            };
            if accepted.is_some() {
                sessions.attach(player_id, room_id)?;
            }
            let reply = Outbound::Ack {
                ack,
                reply: Reply::Joined(accepted),
            };
            state.deliver(&sessions, player_id, Some(reply), out).await;
        }

        Action::Play { index } => {
            let mut rooms = state.rooms.lock().await;
            let sessions = state.sessions.lock().await;
            let room_id = sessions.room_of(player_id)?;
            rooms.play(room_id, player_id, index, &mut out)?;
            state.deliver(&sessions, player_id, None, out).await;
        }

        Action::Start => {
            let mut rooms = state.rooms.lock().await;
            let sessions = state.sessions.lock().await;
            let room_id = sessions.room_of(player_id)?;
            rooms.start(room_id, player_id, &mut out).await?;
            state.deliver(&sessions, player_id, None, out).await;
        }

        Action::Restart => {
            let mut rooms = state.rooms.lock().await;
            let sessions = state.sessions.lock().await;
            let room_id = sessions.room_of(player_id)?;
            rooms.restart(room_id, player_id, &mut out)?;
            state.deliver(&sessions, player_id, None, out).await;
        }

        Action::GameOver => {
            let mut rooms = state.rooms.lock().await;
            let sessions = state.sessions.lock().await;
            let room_id = sessions.room_of(player_id)?;
            rooms.game_over(room_id, player_id, &mut out)?;
            state.deliver(&sessions, player_id, None, out).await;
        }

        Action::LeaveRoom => {
            let mut rooms = state.rooms.lock().await;
            let mut sessions = state.sessions.lock().await;
            // detach first so the leaver is not told about its own departure
            let room_id = sessions.detach(player_id)?;
            leave_room(&mut rooms, room_id, player_id, &mut out).await?;
            state.deliver(&sessions, player_id, None, out).await;
        }

        Action::Stats => {
            let snapshot = state.rooms.lock().await.stats().await?;
            let reply = Outbound::Ack {
                ack,
                reply: Reply::Stats(snapshot),
            };
            state.reply(player_id, reply).await;
        }

        Action::Heartbeat { client_time } => {
            let reply = Outbound::Ack {
                ack,
                reply: Reply::Heartbeat {
                    client_time,
                    server_time: unix_millis(),
                },
            };
            state.reply(player_id, reply).await;
        }
    }

    Ok(())
}

/// Removes a player from a room that may already have been reaped.
async fn leave_room<S: KeyValueStore>(
    rooms: &mut RoomRegistry<S>,
    room_id: RoomId,
    player_id: PlayerId,
    out: &mut Outbox,
) -> Result<(), PairQuestError> {
    match rooms.leave(&room_id, player_id, out).await {
        Ok(()) => {
            tracing::info!(%player_id, %room_id, "player left room");
            Ok(())
        }
        Err(RoomError::NotFound(_)) => {
            tracing::debug!(%player_id, %room_id, "room already gone");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Leaves the current room, if any, and forgets the player.
async fn disconnect<S, C>(state: &ServerState<S, C>, player_id: PlayerId)
where
    S: KeyValueStore,
    C: Codec,
{
    let mut out = Outbox::new();
    let mut rooms = state.rooms.lock().await;
    let mut sessions = state.sessions.lock().await;

    if let Ok(room_id) = sessions.detach(player_id) {
        if let Err(e) = leave_room(&mut rooms, room_id, player_id, &mut out).await {
            tracing::warn!(%player_id, error = %e, "leave on disconnect failed");
        }
    }
    let connected_for = sessions.get(&player_id).map(|s| s.connected_at.elapsed());
    match sessions.close(player_id) {
        Ok(_) => tracing::debug!(%player_id, ?connected_for, "session closed"),
        Err(e) => tracing::debug!(%player_id, error = %e, "no session to close"),
    }

    let mut hub = state.hub.lock().await;
    hub.unregister(player_id);
    hub.dispatch(&sessions, out);
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
