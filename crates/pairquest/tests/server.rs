//! Integration tests for the server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pairquest::prelude::*;
use pairquest_protocol::{JoinAccepted, StatsSnapshot, StatsUpdate};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    ws_addr: String,
    http_addr: Option<std::net::SocketAddr>,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        http_addr: None,
        retry: RetryPolicy::none(),
        ..ServerConfig::default()
    }
}

/// Starts a server on a random port.
async fn start_server_with(config: ServerConfig) -> TestServer {
    let server = PairQuestServerBuilder::new()
        .config(config)
        .build(MemoryStore::new())
        .await
        .expect("server should build");

    let ws_addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let http_addr = server.http_addr();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    TestServer { ws_addr, http_addr }
}

async fn start_server() -> String {
    start_server_with(test_config()).await.ws_addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("send");
}

async fn request(ws: &mut ClientWs, ack: u64, action: Value) {
    send(ws, json!({ "ack": ack, "action": action })).await;
}

async fn recv(ws: &mut ClientWs) -> Outbound {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("recv");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    match recv(ws).await {
        Outbound::Event(event) => event,
        other => panic!("expected Event, got {other:?}"),
    }
}

async fn recv_reply(ws: &mut ClientWs, expected_ack: u64) -> Reply {
    match recv(ws).await {
        Outbound::Ack { ack, reply } => {
            assert_eq!(ack, Some(expected_ack));
            reply
        }
        other => panic!("expected Ack, got {other:?}"),
    }
}

async fn recv_error(ws: &mut ClientWs) -> (Option<u64>, u16) {
    match recv(ws).await {
        Outbound::Error { ack, code, .. } => (ack, code),
        other => panic!("expected Error, got {other:?}"),
    }
}

/// Round-trips a heartbeat so the server has registered this peer.
async fn ready(ws: &mut ClientWs) {
    request(ws, 0, json!({ "type": "heartbeat", "clientTime": 0 })).await;
    assert!(matches!(recv_reply(ws, 0).await, Reply::Heartbeat { .. }));
}

/// Asserts nothing arrives within a short window.
async fn assert_silent(ws: &mut ClientWs) {
    let next = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
    assert!(next.is_err(), "expected no frame, got {next:?}");
}

fn create_room(capacity: usize, grid_size: usize, host: &str) -> Value {
    json!({
        "type": "create_room",
        "numOfPlayers": capacity,
        "gridSize": grid_size,
        "theme": "numbers",
        "hostClientId": host,
    })
}

fn join_room(room_id: &RoomId, client_id: &str) -> Value {
    json!({ "type": "join_room", "roomId": room_id.as_str(), "clientId": client_id })
}

/// Creates a room through `host` and drains the creation frames.
async fn create(ws: &mut ClientWs, capacity: usize, grid_size: usize) -> RoomId {
    request(ws, 1, create_room(capacity, grid_size, "host")).await;
    let room_id = match recv_reply(ws, 1).await {
        Reply::RoomCreated(id) => id,
        other => panic!("expected RoomCreated, got {other:?}"),
    };
    assert!(matches!(recv_event(ws).await, ServerEvent::Stats(_)));
    room_id
}

async fn join(ws: &mut ClientWs, ack: u64, room_id: &RoomId, client_id: &str) -> Option<JoinAccepted> {
    request(ws, ack, join_room(room_id, client_id)).await;
    match recv_reply(ws, ack).await {
        Reply::Joined(accepted) => accepted,
        other => panic!("expected Joined, got {other:?}"),
    }
}

/// Two players in a started 4-tile room. Returns the board seen by both.
async fn started_pair(addr: &str) -> (ClientWs, ClientWs, PlayerId, PlayerId, Vec<String>) {
    let mut a = connect(addr).await;
    let room_id = create(&mut a, 2, 4).await;
    let first = join(&mut a, 2, &room_id, "host").await.expect("host joins");
    assert!(matches!(recv_event(&mut a).await, ServerEvent::UpdatePlayers(_)));

    let mut b = connect(addr).await;
    let second = join(&mut b, 1, &room_id, "guest").await.expect("guest joins");

    let mut board = Vec::new();
    for ws in [&mut a, &mut b] {
        assert!(matches!(recv_event(ws).await, ServerEvent::UpdatePlayers(p) if p.len() == 2));
        match recv_event(ws).await {
            ServerEvent::StartGame {
                board_items,
                next_player,
            } => {
                assert_eq!(next_player, Some(first.player.id));
                board = board_items;
            }
            other => panic!("expected StartGame, got {other:?}"),
        }
        assert!(matches!(
            recv_event(ws).await,
            ServerEvent::Stats(StatsUpdate {
                games_played: Some(1),
                ..
            })
        ));
    }
    (a, b, first.player.id, second.player.id, board)
}

/// Indices of the two pairs on a 4-tile board: `(i, j)` match, `(k, l)` match.
fn pairs(board: &[String]) -> ((usize, usize), (usize, usize)) {
    let j = (1..4).find(|&j| board[j] == board[0]).expect("pair for tile 0");
    let rest: Vec<usize> = (1..4).filter(|&x| x != j).collect();
    ((0, j), (rest[0], rest[1]))
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    request(&mut ws, 9, json!({ "type": "heartbeat", "clientTime": 12345 })).await;
    match recv_reply(&mut ws, 9).await {
        Reply::Heartbeat {
            client_time,
            server_time,
        } => {
            assert_eq!(client_time, 12345);
            assert!(server_time > 0);
        }
        other => panic!("expected Heartbeat, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_is_rejected_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json")).await.unwrap();
    assert_eq!(recv_error(&mut ws).await, (None, 400));

    send(&mut ws, json!({ "action": { "type": "teleport" } })).await;
    assert_eq!(recv_error(&mut ws).await, (None, 400));

    request(&mut ws, 2, json!({ "type": "heartbeat", "clientTime": 1 })).await;
    assert!(matches!(recv_reply(&mut ws, 2).await, Reply::Heartbeat { .. }));
}

#[tokio::test]
async fn test_create_room_acks_id_and_broadcasts_link_count() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut bystander = connect(&addr).await;
    ready(&mut bystander).await;

    request(&mut host, 1, create_room(2, 16, "host")).await;
    assert!(matches!(recv_reply(&mut host, 1).await, Reply::RoomCreated(_)));

    let expected = ServerEvent::Stats(StatsUpdate {
        links_created: Some(1),
        games_played: None,
    });
    assert_eq!(recv_event(&mut host).await, expected);
    assert_eq!(recv_event(&mut bystander).await, expected);
}

#[tokio::test]
async fn test_create_room_invalid_settings_returns_400_with_ack() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    request(&mut ws, 4, create_room(2, 5, "host")).await;
    assert_eq!(recv_error(&mut ws).await, (Some(4), 400));

    let mut bad_theme = create_room(2, 4, "host");
    bad_theme["theme"] = json!("colours");
    request(&mut ws, 5, bad_theme).await;
    assert_eq!(recv_error(&mut ws).await, (Some(5), 400));
}

#[tokio::test]
async fn test_join_unknown_room_acks_null() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let room_id = RoomId::parse("nosuchroom").unwrap();
    assert!(join(&mut ws, 1, &room_id, "c-1").await.is_none());
}

#[tokio::test]
async fn test_join_returns_seat_roster_and_room_info() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let room_id = create(&mut ws, 3, 8).await;

    let accepted = join(&mut ws, 2, &room_id, "host").await.expect("seat");
    assert_eq!(accepted.player.no, 1);
    assert!(accepted.player.is_host);
    assert_eq!(accepted.players.len(), 1);
    assert_eq!(accepted.room.theme, "numbers");
    assert_eq!(accepted.room.room_size, 3);
    assert_eq!(accepted.room.grid_size, 8);

    assert_eq!(
        recv_event(&mut ws).await,
        ServerEvent::UpdatePlayers(vec![accepted.player])
    );
}

#[tokio::test]
async fn test_join_full_room_acks_null() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let room_id = create(&mut a, 2, 4).await;
    let mut b = connect(&addr).await;
    assert!(join(&mut a, 2, &room_id, "host").await.is_some());
    assert!(join(&mut b, 1, &room_id, "b").await.is_some());

    // connected after the room filled, so no broadcasts are queued ahead
    let mut c = connect(&addr).await;
    assert!(join(&mut c, 1, &room_id, "c").await.is_none());
}

#[tokio::test]
async fn test_join_while_seated_acks_null() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let first = create(&mut ws, 2, 4).await;
    let second = create(&mut ws, 2, 4).await;

    assert!(join(&mut ws, 2, &first, "host").await.is_some());
    assert!(matches!(recv_event(&mut ws).await, ServerEvent::UpdatePlayers(_)));
    assert!(join(&mut ws, 3, &second, "host").await.is_none());
}

#[tokio::test]
async fn test_play_outside_room_returns_409() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    request(&mut ws, 1, json!({ "type": "play", "index": 0 })).await;
    assert_eq!(recv_error(&mut ws).await, (Some(1), 409));

    request(&mut ws, 2, json!({ "type": "leave_room" })).await;
    assert_eq!(recv_error(&mut ws).await, (Some(2), 409));
}

#[tokio::test]
async fn test_full_game_over_the_wire() {
    let addr = start_server().await;
    let (mut a, mut b, pa, pb, board) = started_pair(&addr).await;
    let ((i, j), (k, l)) = pairs(&board);

    // a misses: i then k
    request(&mut a, 10, json!({ "type": "play", "index": i })).await;
    request(&mut a, 11, json!({ "type": "play", "index": k })).await;
    for ws in [&mut a, &mut b] {
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![i]));
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![i, k]));
        assert_eq!(
            recv_event(ws).await,
            ServerEvent::NoMatch {
                flipped_pair: vec![],
                next_player: Some(pb),
            }
        );
    }

    // b clears the board
    for (ack, index) in [(20, i), (21, j), (22, k), (23, l)] {
        request(&mut b, ack, json!({ "type": "play", "index": index })).await;
    }
    for ws in [&mut a, &mut b] {
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![i]));
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![i, j]));
        match recv_event(ws).await {
            ServerEvent::MatchFound { opened, players, .. } => {
                assert_eq!(opened, vec![i, j]);
                let scorer = players.iter().find(|p| p.id == pb).unwrap();
                assert_eq!(scorer.score, 1);
            }
            other => panic!("expected MatchFound, got {other:?}"),
        }
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![k]));
        assert_eq!(recv_event(ws).await, ServerEvent::UpdateFlippedPair(vec![k, l]));
        assert!(matches!(recv_event(ws).await, ServerEvent::MatchFound { opened, .. } if opened.len() == 4));
        assert_eq!(recv_event(ws).await, ServerEvent::GameOver);
    }

    // further plays are rejected
    request(&mut a, 30, json!({ "type": "play", "index": i })).await;
    assert_eq!(recv_error(&mut a).await, (Some(30), 400));

    // restart deals a fresh board with scores reset
    request(&mut a, 31, json!({ "type": "restart" })).await;
    for ws in [&mut a, &mut b] {
        match recv_event(ws).await {
            ServerEvent::Restart {
                board_items,
                next_player,
                players,
            } => {
                assert_eq!(board_items.len(), 4);
                assert_eq!(next_player, Some(pa));
                assert!(players.iter().all(|p| p.score == 0));
            }
            other => panic!("expected Restart, got {other:?}"),
        }
    }

    request(&mut a, 32, json!({ "type": "stats" })).await;
    assert_eq!(
        recv_reply(&mut a, 32).await,
        Reply::Stats(StatsSnapshot {
            games_played: 1,
            links_created: 1,
        })
    );
}

#[tokio::test]
async fn test_gameover_action_broadcasts_to_room() {
    let addr = start_server().await;
    let (mut a, mut b, _, _, _) = started_pair(&addr).await;

    request(&mut b, 5, json!({ "type": "gameover" })).await;
    assert_eq!(recv_event(&mut a).await, ServerEvent::GameOver);
    assert_eq!(recv_event(&mut b).await, ServerEvent::GameOver);
}

#[tokio::test]
async fn test_leave_room_notifies_others_but_not_leaver() {
    let addr = start_server().await;
    let (mut a, mut b, pa, pb, _) = started_pair(&addr).await;

    request(&mut a, 5, json!({ "type": "leave_room" })).await;

    match recv_event(&mut b).await {
        ServerEvent::PlayerLeft(view) => assert_eq!(view.id, pa),
        other => panic!("expected PlayerLeft, got {other:?}"),
    }
    match recv_event(&mut b).await {
        ServerEvent::UpdatePlayers(players) => {
            assert_eq!(players.len(), 1);
            assert_eq!(players[0].id, pb);
        }
        other => panic!("expected UpdatePlayers, got {other:?}"),
    }
    // a held the turn, so it moves to b
    assert_eq!(recv_event(&mut b).await, ServerEvent::NextPlayer(pb));
    assert_silent(&mut a).await;

    // a is back in the lobby
    request(&mut a, 6, json!({ "type": "play", "index": 0 })).await;
    assert_eq!(recv_error(&mut a).await, (Some(6), 409));
}

#[tokio::test]
async fn test_disconnect_counts_as_leaving() {
    let addr = start_server().await;
    let (a, mut b, pa, _, _) = started_pair(&addr).await;

    drop(a);

    match recv_event(&mut b).await {
        ServerEvent::PlayerLeft(view) => assert_eq!(view.id, pa),
        other => panic!("expected PlayerLeft, got {other:?}"),
    }
    assert!(matches!(recv_event(&mut b).await, ServerEvent::UpdatePlayers(p) if p.len() == 1));
}

#[tokio::test]
async fn test_manual_start_before_full() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let room_id = create(&mut ws, 4, 4).await;
    let me = join(&mut ws, 2, &room_id, "host").await.unwrap();
    assert!(matches!(recv_event(&mut ws).await, ServerEvent::UpdatePlayers(_)));

    request(&mut ws, 3, json!({ "type": "start" })).await;
    match recv_event(&mut ws).await {
        ServerEvent::StartGame { next_player, .. } => assert_eq!(next_player, Some(me.player.id)),
        other => panic!("expected StartGame, got {other:?}"),
    }
    assert!(matches!(recv_event(&mut ws).await, ServerEvent::Stats(_)));

    // closed to late joiners
    let mut late = connect(&addr).await;
    assert!(join(&mut late, 1, &room_id, "late").await.is_none());
}

#[tokio::test]
async fn test_enforced_turns_reject_out_of_turn_play() {
    let mut config = test_config();
    config.rules.enforce_turns = true;
    let addr = start_server_with(config).await.ws_addr;
    let (_a, mut b, _, _, _) = started_pair(&addr).await;

    request(&mut b, 7, json!({ "type": "play", "index": 0 })).await;
    assert_eq!(recv_error(&mut b).await, (Some(7), 403));
}

#[tokio::test]
async fn test_host_only_controls_reject_guest_restart() {
    let mut config = test_config();
    config.rules.host_only_controls = true;
    let addr = start_server_with(config).await.ws_addr;
    let (_a, mut b, _, _, _) = started_pair(&addr).await;

    request(&mut b, 8, json!({ "type": "restart" })).await;
    assert_eq!(recv_error(&mut b).await, (Some(8), 403));
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let mut config = test_config();
    config.connection_timeout = Duration::from_millis(100);
    let addr = start_server_with(config).await.ws_addr;
    let mut ws = connect(&addr).await;

    let end = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) => return,
                Some(Ok(msg)) if msg.is_close() => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "server should close an idle connection");
}

#[tokio::test]
async fn test_http_health_and_index() {
    let mut config = test_config();
    config.http_addr = Some("127.0.0.1:0".into());
    config.app_url = "https://memory.example".into();
    let server = start_server_with(config).await;
    let http_addr = server.http_addr.expect("http enabled");

    let get = |path: &'static str| async move {
        let mut stream = tokio::net::TcpStream::connect(http_addr).await.unwrap();
        stream
            .write_all(format!("GET {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    };

    let health = get("/health").await;
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(health.ends_with(r#"{"message":"health check"}"#));

    let index = get("/").await;
    assert!(index.contains(r#"<a href="https://memory.example">here</a>"#));

    let missing = get("/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404"));
}
