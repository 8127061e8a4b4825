#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use doodlechain_core::net::messages::{ClientMessage, JoinMsg, ServerMessage};
use doodlechain_core::net::protocol::encode_client_message;
use doodlechain_core::room::Room;

use doodlechain_server::config::ServerConfig;
use doodlechain_server::{build_app, spawn_janitor};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_janitor(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client and consume the greeting frame.
pub async fn ws_connect(url: &str) -> WsStream {
    let (mut stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let greeting = ws_read_msg(&mut stream).await;
    assert!(
        matches!(greeting, ServerMessage::Pong),
        "Expected greeting pong, got: {greeting:?}"
    );
    stream
}

/// Connect without consuming anything, for tests that inspect the
/// greeting itself.
pub async fn ws_connect_raw(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Text(encoded.into())).await.unwrap();
}

pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream
        .send(Message::Text(text.to_string().into()))
        .await
        .unwrap();
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_msg(stream: &mut WsStream) -> ServerMessage {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read a ServerMessage, returning None on timeout.
pub async fn ws_try_read_msg(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                }
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Join a room over WebSocket and return (room, player_id). Skips the
/// joiner's own PlayerJoined broadcast, which arrives before the
/// JoinSuccess reply.
pub async fn ws_join(stream: &mut WsStream, room_id: &str, name: &str) -> (Room, String) {
    ws_send_client_msg(
        stream,
        &ClientMessage::Join(JoinMsg {
            player_name: name.to_string(),
            room_id: room_id.to_string(),
        }),
    )
    .await;

    loop {
        match ws_read_msg(stream).await {
            ServerMessage::JoinSuccess { room, player_id } => return (room, player_id),
            ServerMessage::PlayerJoined { .. } => continue,
            other => panic!("Expected JoinSuccess, got: {other:?}"),
        }
    }
}

/// Join a room over WebSocket expecting rejection; returns the error
/// message.
pub async fn ws_join_expect_error(stream: &mut WsStream, room_id: &str, name: &str) -> String {
    ws_send_client_msg(
        stream,
        &ClientMessage::Join(JoinMsg {
            player_name: name.to_string(),
            room_id: room_id.to_string(),
        }),
    )
    .await;

    match ws_read_msg(stream).await {
        ServerMessage::Error { message } => message,
        other => panic!("Expected Error, got: {other:?}"),
    }
}

/// Create a room over HTTP. Returns (room_id, host_player_id).
pub async fn http_create_room(base_url: &str, host_name: &str, max_players: u8) -> (String, String) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/rooms"))
        .json(&serde_json::json!({
            "playerName": host_name,
            "roomName": "Doodle Night",
            "maxPlayers": max_players,
            "maxRounds": 3,
            "timeLimit": 60,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let room_id = body["data"]["room"]["id"].as_str().unwrap().to_string();
    let player_id = body["data"]["playerId"].as_str().unwrap().to_string();
    (room_id, player_id)
}

/// Fetch a room snapshot over HTTP; None if the room is gone.
pub async fn http_get_room(base_url: &str, room_id: &str) -> Option<serde_json::Value> {
    let resp = reqwest::get(format!("{base_url}/rooms/{room_id}"))
        .await
        .unwrap();
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return None;
    }
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    Some(body["data"]["room"].clone())
}
