//! WebSocket transport integration tests
//!
//! Boots a real server and drives it with tokio-tungstenite clients to cover
//! the push path: the connect/roster handshake, membership announcements,
//! chat and signal fan-out, screen-share relay, the keepalive that holds
//! quiet connections in their rooms, and the teardown routes (leave frames,
//! socket closes, unresponsive-socket expiry).

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, protocol::Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use signalhub_relay_server::{RelayConfig, RelayServerBuilder, RelayServerHandle, ServerConfig};
use signalhub_room_core::RoomId;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(relay: RelayConfig) -> RelayServerHandle {
    let config = ServerConfig::default()
        .with_bind_addr("127.0.0.1:0".parse().unwrap())
        .with_relay(relay);
    RelayServerBuilder::new()
        .with_config(config)
        .build()
        .await
        .expect("server should build")
        .start()
}

async fn connect(server: &RelayServerHandle, room: &str, user: &str) -> WsClient {
    let url = format!("{}/api/rooms/{}/ws?userId={}", server.ws_url(), room, user);
    let (socket, _) = connect_async(url).await.expect("websocket should connect");
    socket
}

async fn next_frame(socket: &mut WsClient) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("expected a frame before the deadline")
            .expect("stream ended while waiting for a frame")
            .expect("websocket read should succeed");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send_frame(socket: &mut WsClient, frame: Value) {
    socket
        .send(Message::Text(frame.to_string()))
        .await
        .expect("websocket send should succeed");
}

/// Connects and consumes the roster frame, asserting its membership.
async fn connect_and_greet(server: &RelayServerHandle, room: &str, user: &str) -> WsClient {
    let mut socket = connect(server, room, user).await;
    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["type"], "roomUsers");
    socket
}

/// Asserts no frame arrives for 300ms. Keepalive pings are not frames.
async fn assert_silent(socket: &mut WsClient) {
    let deadline = std::time::Instant::now() + Duration::from_millis(300);
    loop {
        let now = std::time::Instant::now();
        if now >= deadline {
            return;
        }
        match timeout(deadline - now, socket.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            other => panic!("expected no frame, got {other:?}"),
        }
    }
}

async fn assert_closed(socket: &mut WsClient) {
    loop {
        match timeout(Duration::from_secs(2), socket.next()).await {
            Ok(None) => return,
            Ok(Some(Ok(Message::Close(_)))) => return,
            Ok(Some(Err(_))) => return,
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            other => panic!("expected the socket to close, got {other:?}"),
        }
    }
}

fn members(server: &RelayServerHandle, room: &str) -> Vec<String> {
    let mut users: Vec<String> = server
        .directory()
        .list_participants(&RoomId::from(room))
        .into_iter()
        .map(|p| p.as_str().to_string())
        .collect();
    users.sort();
    users
}

fn frame_users(frame: &Value) -> Vec<String> {
    let mut users: Vec<String> = frame["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u.as_str().unwrap().to_string())
        .collect();
    users.sort();
    users
}

#[tokio::test]
async fn test_connect_joins_and_receives_the_roster() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect(&server, "standup", "alice").await;
    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "roomUsers");
    assert_eq!(frame_users(&frame), vec!["alice"]);
    assert_eq!(members(&server, "standup"), vec!["alice"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_join_is_announced_to_present_members() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    let mut bob = connect(&server, "standup", "bob").await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "roomUsers");
    assert_eq!(frame_users(&frame), vec!["alice", "bob"]);

    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "userJoined");
    assert_eq!(frame["userId"], "bob");

    server.shutdown().await;
}

#[tokio::test]
async fn test_chat_frames_fan_out_to_everyone() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    let mut bob = connect_and_greet(&server, "standup", "bob").await;
    let joined = next_frame(&mut alice).await;
    assert_eq!(joined["type"], "userJoined");

    send_frame(&mut alice, json!({ "type": "chat", "text": "hello" })).await;

    // The sender hears its own message back, like everyone else.
    for socket in [&mut alice, &mut bob] {
        let frame = next_frame(socket).await;
        assert_eq!(frame["type"], "chat");
        assert_eq!(frame["message"]["senderId"], "alice");
        assert_eq!(frame["message"]["text"], "hello");
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_signal_frames_reach_only_the_addressee() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "call", "alice").await;
    let mut bob = connect_and_greet(&server, "call", "bob").await;
    let mut carol = connect_and_greet(&server, "call", "carol").await;
    next_frame(&mut alice).await; // bob joined
    next_frame(&mut alice).await; // carol joined
    next_frame(&mut bob).await; // carol joined

    send_frame(
        &mut alice,
        json!({
            "type": "signal",
            "to": "bob",
            "kind": "offer",
            "payload": { "sdp": "v=0\r\n", "type": "offer" }
        }),
    )
    .await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "signal");
    assert_eq!(frame["message"]["fromId"], "alice");
    assert_eq!(frame["message"]["toId"], "bob");
    assert_eq!(frame["message"]["kind"], "offer");
    assert_eq!(
        frame["message"]["payload"],
        json!({ "sdp": "v=0\r\n", "type": "offer" })
    );

    assert_silent(&mut carol).await;
    assert_silent(&mut alice).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_screen_share_is_relayed_but_never_stored() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    let mut bob = connect_and_greet(&server, "standup", "bob").await;
    next_frame(&mut alice).await; // bob joined

    send_frame(&mut alice, json!({ "type": "screenShare", "active": true })).await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "screenShare");
    assert_eq!(frame["userId"], "alice");
    assert_eq!(frame["active"], true);

    // No echo to the presenter.
    assert_silent(&mut alice).await;

    // Screen-share state never lands in either log.
    let client = reqwest::Client::new();
    let body: Value = client
        .get(format!("{}/api/rooms/standup/messages", server.url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["messages"], json!([]));
    let body: Value = client
        .get(format!(
            "{}/api/rooms/standup/signaling?userId=bob",
            server.url()
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["messages"], json!([]));

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_frames_get_an_error_reply() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    send_frame(&mut alice, json!("not an object")).await;

    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "error");
    assert!(frame["message"].as_str().unwrap().contains("invalid"));

    // The connection survives a bad frame.
    send_frame(&mut alice, json!({ "type": "chat", "text": "still here" })).await;
    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "chat");

    server.shutdown().await;
}

#[tokio::test]
async fn test_leave_frame_departs_the_room() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    let mut bob = connect_and_greet(&server, "standup", "bob").await;
    next_frame(&mut alice).await; // bob joined

    send_frame(&mut alice, json!({ "type": "leave" })).await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "userLeft");
    assert_eq!(frame["userId"], "alice");
    assert_eq!(members(&server, "standup"), vec!["bob"]);

    assert_closed(&mut alice).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_socket_close_departs_the_room() {
    let server = start_server(RelayConfig::default()).await;

    let mut alice = connect_and_greet(&server, "standup", "alice").await;
    let mut bob = connect_and_greet(&server, "standup", "bob").await;
    next_frame(&mut alice).await; // bob joined

    alice.close(None).await.unwrap();

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "userLeft");
    assert_eq!(frame["userId"], "alice");
    assert_eq!(members(&server, "standup"), vec!["bob"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_http_activity_is_pushed_to_sockets() {
    let server = start_server(RelayConfig::default()).await;
    let client = reqwest::Client::new();

    let mut bob = connect_and_greet(&server, "hybrid", "bob").await;

    let resp = client
        .post(format!("{}/api/rooms/hybrid/join", server.url()))
        .json(&json!({ "userId": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "userJoined");
    assert_eq!(frame["userId"], "alice");

    client
        .post(format!("{}/api/rooms/hybrid/messages", server.url()))
        .json(&json!({ "userId": "alice", "text": "posted over http" }))
        .send()
        .await
        .unwrap();

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "chat");
    assert_eq!(frame["message"]["text"], "posted over http");
    assert_eq!(members(&server, "hybrid"), vec!["alice", "bob"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_connect_without_user_id_is_rejected() {
    let server = start_server(RelayConfig::default()).await;

    let url = format!("{}/api/rooms/standup/ws", server.ws_url());
    match connect_async(url).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 400),
        other => panic!("expected an http rejection, got {other:?}"),
    }
    assert!(!server.directory().room_exists(&RoomId::from("standup")));

    server.shutdown().await;
}

#[tokio::test]
async fn test_quiet_connected_socket_stays_a_member() {
    let relay = RelayConfig::default()
        .with_participant_liveness_ms(150)
        .with_room_max_idle_ms(60_000)
        .with_reap_interval_ms(30);
    let server = start_server(relay).await;

    let mut alice = connect_and_greet(&server, "quiet", "alice").await;

    // Alice reads her stream but sends nothing, like a viewer in a silent
    // call. The server's keepalive pings are ponged automatically by the
    // client stack (a browser behaves the same), and those pongs carry the
    // liveness that sees her through many sweeps.
    let mut pings = 0usize;
    let deadline = std::time::Instant::now() + Duration::from_millis(600);
    loop {
        let now = std::time::Instant::now();
        if now >= deadline {
            break;
        }
        match timeout(deadline - now, alice.next()).await {
            Err(_) => break,
            Ok(Some(Ok(Message::Ping(_)))) => pings += 1,
            Ok(Some(Ok(Message::Pong(_)))) => {}
            other => panic!("expected only keepalive pings, got {other:?}"),
        }
    }

    assert!(pings > 0, "the server should ping open connections");
    assert_eq!(members(&server, "quiet"), vec!["alice"]);

    // Still a functional member after the quiet stretch.
    send_frame(&mut alice, json!({ "type": "chat", "text": "still here" })).await;
    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "chat");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unresponsive_socket_is_expired_by_the_reaper() {
    let relay = RelayConfig::default()
        .with_participant_liveness_ms(80)
        .with_room_max_idle_ms(60_000)
        .with_reap_interval_ms(25);
    let server = start_server(relay).await;

    let mut alice = connect_and_greet(&server, "idle", "alice").await;

    // Alice stops reading entirely, so the server's pings go unanswered.
    // The reaper drops the membership and the server closes the socket.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_closed(&mut alice).await;
    assert_eq!(members(&server, "idle"), Vec::<String>::new());

    server.shutdown().await;
}
