use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::RwLock;

use doodlechain_core::net::messages::ServerMessage;
use doodlechain_core::net::protocol::encode_server_message;

use crate::connections::{ConnId, ConnectionTable};

/// Delivers outbound messages to room members. A pure reader of the
/// connection table: it never mutates registry or table state, so
/// callers must commit the triggering mutation (and release its lock)
/// before broadcasting.
#[derive(Clone)]
pub struct BroadcastEngine {
    connections: Arc<RwLock<ConnectionTable>>,
}

impl BroadcastEngine {
    pub fn new(connections: Arc<RwLock<ConnectionTable>>) -> Self {
        Self { connections }
    }

    /// Best-effort delivery to every connection bound to `room_id`.
    /// The frame is encoded once and shared; connections whose
    /// transport is not currently writable are skipped, with no retry.
    pub async fn broadcast(&self, room_id: &str, msg: &ServerMessage) {
        let frame = match encode_server_message(msg) {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                tracing::warn!(room = %room_id, error = %e, "Failed to encode broadcast");
                return;
            }
        };

        let recipients = {
            let table = self.connections.read().await;
            table.connections_in_room(room_id)
        };
        for (conn, sender) in recipients {
            if sender.try_send(frame.clone()).is_err() {
                tracing::debug!(conn, room = %room_id, "Skipping broadcast to slow client");
            }
        }
    }

    /// Send a message to a single connection, bound or not.
    pub async fn send(&self, conn: ConnId, msg: &ServerMessage) {
        let frame = match encode_server_message(msg) {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                tracing::warn!(conn, error = %e, "Failed to encode message");
                return;
            }
        };

        let sender = {
            let table = self.connections.read().await;
            table.sender(conn)
        };
        if let Some(sender) = sender {
            if sender.try_send(frame).is_err() {
                tracing::debug!(conn, "Dropping reply to slow or closed client");
            }
        }
    }
}
