use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use doodlechain_core::net::messages::ServerMessage;
use doodlechain_core::net::protocol::encode_server_message;

use crate::router::MessageRouter;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let router = MessageRouter::new(&state);

    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let conn = {
        let mut table = state.connections.write().await;
        table.insert(tx)
    };
    tracing::debug!(conn, "WebSocket connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Greet the client so it can confirm the channel is live before
    // sending a join.
    if let Ok(greeting) = encode_server_message(&ServerMessage::Pong) {
        if ws_sender
            .send(Message::Text(Utf8Bytes::from(greeting)))
            .await
            .is_err()
        {
            let mut table = state.connections.write().await;
            table.remove(conn);
            return;
        }
    }

    spawn_writer(ws_sender, rx);

    // Read loop: every application frame goes through the router.
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => router.handle(conn, text.as_str()).await,
            Message::Close(_) => break,
            _ => continue,
        }
    }

    // Transport gone. The close path runs exactly once per connection
    // because only this task ever reads the socket.
    router.handle_close(conn).await;
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });
}
