use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use tokio::sync::mpsc;

use doodlechain_core::player::PlayerId;
use doodlechain_core::room::RoomId;

/// Identifier for one live transport connection.
pub type ConnId = u64;

/// Per-connection sender for outbound text frames. Bounded so a slow
/// client cannot exhaust memory; `Utf8Bytes` clones are cheap, so a
/// broadcast encodes once and shares the frame across channels.
pub type FrameSender = mpsc::Sender<Utf8Bytes>;

/// The (player, room) pair a connection speaks for once it has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub player_id: PlayerId,
    pub room_id: RoomId,
}

struct ConnEntry {
    sender: FrameSender,
    binding: Option<Binding>,
}

/// Counts for the stats endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub bound_connections: usize,
}

/// Maps each live connection to its outbound channel and optional
/// player/room binding. A connection with no binding is inert; an
/// entry exists for the whole life of the transport and is removed
/// when it closes, bound or not.
#[derive(Default)]
pub struct ConnectionTable {
    entries: HashMap<ConnId, ConnEntry>,
    next_conn_id: ConnId,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened transport. Returns its connection id.
    pub fn insert(&mut self, sender: FrameSender) -> ConnId {
        self.next_conn_id += 1;
        let conn = self.next_conn_id;
        self.entries.insert(
            conn,
            ConnEntry {
                sender,
                binding: None,
            },
        );
        conn
    }

    /// Associate a connection with a player and room after a
    /// successful join.
    pub fn bind(&mut self, conn: ConnId, player_id: PlayerId, room_id: RoomId) {
        if let Some(entry) = self.entries.get_mut(&conn) {
            entry.binding = Some(Binding { player_id, room_id });
        }
    }

    /// Clear a connection's binding, returning what it was bound to.
    pub fn unbind(&mut self, conn: ConnId) -> Option<Binding> {
        self.entries.get_mut(&conn)?.binding.take()
    }

    pub fn lookup(&self, conn: ConnId) -> Option<Binding> {
        self.entries.get(&conn)?.binding.clone()
    }

    pub fn sender(&self, conn: ConnId) -> Option<FrameSender> {
        self.entries.get(&conn).map(|e| e.sender.clone())
    }

    /// Drop a connection entirely (transport closed). Returns the
    /// binding it held, if any.
    pub fn remove(&mut self, conn: ConnId) -> Option<Binding> {
        self.entries.remove(&conn)?.binding
    }

    /// Senders for every connection currently bound to `room_id`.
    pub fn connections_in_room(&self, room_id: &str) -> Vec<(ConnId, FrameSender)> {
        self.entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.room_id == room_id)
            })
            .map(|(&conn, entry)| (conn, entry.sender.clone()))
            .collect()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.entries.len(),
            bound_connections: self
                .entries
                .values()
                .filter(|e| e.binding.is_some())
                .count(),
        }
    }
}
