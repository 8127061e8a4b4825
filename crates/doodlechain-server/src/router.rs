use std::sync::Arc;

use doodlechain_core::net::messages::{ClientMessage, JoinMsg, ServerMessage};
use doodlechain_core::net::protocol::{decode_client_message, ProtocolError};
use doodlechain_core::room::{Room, PLAYER_NAME_MAX};
use doodlechain_core::time::unix_millis_now;

use crate::broadcast::BroadcastEngine;
use crate::connections::ConnId;
use crate::state::{AppState, SharedConnections, SharedRegistry};

/// Single entry point for inbound live-connection traffic. The router
/// is the only writer into the registry and connection table: each
/// message becomes one registry operation, committed and unlocked
/// before any broadcast goes out.
#[derive(Clone)]
pub struct MessageRouter {
    registry: SharedRegistry,
    connections: SharedConnections,
    broadcaster: BroadcastEngine,
}

impl MessageRouter {
    pub fn new(state: &AppState) -> Self {
        Self {
            registry: Arc::clone(&state.registry),
            connections: Arc::clone(&state.connections),
            broadcaster: state.broadcaster.clone(),
        }
    }

    /// Decode and dispatch one inbound frame. Faults are reported to
    /// the sending connection only and never close it.
    pub async fn handle(&self, conn: ConnId, text: &str) {
        let msg = match decode_client_message(text) {
            Ok(msg) => msg,
            Err(ProtocolError::UnknownMessageType(tag)) => {
                self.send_error(conn, &format!("Unknown message type: {tag}"))
                    .await;
                return;
            }
            Err(e) => {
                tracing::debug!(conn, error = %e, "Undecodable frame");
                self.send_error(conn, "Invalid message format").await;
                return;
            }
        };

        match msg {
            ClientMessage::Join(join) => self.handle_join(conn, join).await,
            ClientMessage::Leave => self.handle_leave(conn).await,
            ClientMessage::StartGame => self.handle_start_game(conn).await,
            ClientMessage::Ping => self.broadcaster.send(conn, &ServerMessage::Pong).await,
            // Gameplay phases are not implemented yet; submissions are
            // acknowledged by doing nothing.
            ClientMessage::SubmitPrompt(data) => {
                tracing::debug!(conn, payload = %data, "Prompt submission ignored");
            }
            ClientMessage::SubmitDrawing(data) => {
                tracing::debug!(conn, payload = %data, "Drawing submission ignored");
            }
            ClientMessage::SubmitAnswer(data) => {
                tracing::debug!(conn, payload = %data, "Answer submission ignored");
            }
        }
    }

    async fn handle_join(&self, conn: ConnId, join: JoinMsg) {
        let name = join.player_name.trim().to_string();
        // Length limits are in characters, not bytes; names may be
        // multibyte.
        if name.is_empty()
            || name.chars().count() > PLAYER_NAME_MAX
            || name.chars().any(char::is_control)
        {
            self.send_error(conn, "Invalid player name").await;
            return;
        }

        {
            let table = self.connections.read().await;
            if table.lookup(conn).is_some() {
                drop(table);
                self.send_error(conn, "Already in a room").await;
                return;
            }
        }

        let result = {
            let mut registry = self.registry.write().await;
            registry.join_room(name, &join.room_id)
        };
        let (room, player_id) = match result {
            Ok(joined) => joined,
            Err(e) => {
                self.send_error(conn, &e.to_string()).await;
                return;
            }
        };

        {
            let mut table = self.connections.write().await;
            table.bind(conn, player_id.clone(), room.id.clone());
        }

        if let Some(player) = room.player(&player_id).cloned() {
            self.broadcaster
                .broadcast(
                    &room.id,
                    &ServerMessage::PlayerJoined {
                        player,
                        room: room.clone(),
                    },
                )
                .await;
        }
        self.broadcaster
            .send(conn, &ServerMessage::JoinSuccess { room, player_id })
            .await;
    }

    async fn handle_leave(&self, conn: ConnId) {
        let binding = {
            let mut table = self.connections.write().await;
            table.unbind(conn)
        };
        // Leave from an inert connection is a no-op.
        let Some(binding) = binding else { return };

        let removed = {
            let mut registry = self.registry.write().await;
            registry.remove_player(&binding.player_id)
        };
        // None means the room emptied and was deleted with the leave;
        // there is nobody left to notify.
        if let Some(room) = removed {
            let room_id = room.id.clone();
            self.broadcaster
                .broadcast(
                    &room_id,
                    &ServerMessage::PlayerLeft {
                        player_id: binding.player_id,
                        room,
                    },
                )
                .await;
        }
    }

    async fn handle_start_game(&self, conn: ConnId) {
        let binding = {
            let table = self.connections.read().await;
            table.lookup(conn)
        };
        let Some(binding) = binding else {
            self.send_error(conn, "Not in a room").await;
            return;
        };

        let outcome: Result<Room, &str> = {
            let mut registry = self.registry.write().await;
            match registry.get_room(&binding.room_id) {
                None => Err("Room not found"),
                Some(room) => {
                    let is_host = room
                        .player(&binding.player_id)
                        .is_some_and(|p| p.is_host);
                    if !is_host {
                        Err("Only the host can start the game")
                    } else if !registry.start_game(&binding.room_id) {
                        Err("Failed to start game")
                    } else {
                        registry
                            .get_room(&binding.room_id)
                            .ok_or("Room not found")
                    }
                }
            }
        };

        match outcome {
            Ok(room) => {
                let room_id = room.id.clone();
                self.broadcaster
                    .broadcast(&room_id, &ServerMessage::GameStarted { room })
                    .await;
            }
            Err(message) => self.send_error(conn, message).await,
        }
    }

    /// Transport-close path. Marks the bound player disconnected (a
    /// disconnect is not a leave: the room slot survives) and drops
    /// the connection entry. Called exactly once per socket, after its
    /// read loop ends.
    pub async fn handle_close(&self, conn: ConnId) {
        let binding = {
            let mut table = self.connections.write().await;
            table.remove(conn)
        };
        let Some(binding) = binding else {
            tracing::debug!(conn, "Unbound connection closed");
            return;
        };

        let room = {
            let mut registry = self.registry.write().await;
            registry.set_connection_state(&binding.player_id, false, unix_millis_now())
        };
        if let Some(room) = room {
            let room_id = room.id.clone();
            self.broadcaster
                .broadcast(
                    &room_id,
                    &ServerMessage::PlayerDisconnected {
                        player_id: binding.player_id.clone(),
                        room,
                    },
                )
                .await;
        }
        tracing::info!(conn, player = %binding.player_id, "Player disconnected");
    }

    async fn send_error(&self, conn: ConnId, message: &str) {
        self.broadcaster
            .send(
                conn,
                &ServerMessage::Error {
                    message: message.to_string(),
                },
            )
            .await;
    }
}
