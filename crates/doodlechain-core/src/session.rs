use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::room::RoomId;

/// Default window within which a returning client should try to rebind
/// to its previous room instead of starting a new session.
pub const DEFAULT_RECONNECT_WINDOW: Duration = Duration::from_secs(30);

/// Session tuple a client persists locally between page loads.
/// The server never reads this; it is a client-held heuristic, not
/// authoritative session continuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub player_id: PlayerId,
    pub player_name: String,
    pub room_id: Option<RoomId>,
    /// Unix millis of the last successful connection.
    pub last_connected: u64,
}

impl StoredSession {
    /// Whether this session is still worth a reconnect attempt at `now`
    /// (Unix millis). A session without a room is never eligible.
    pub fn should_reconnect(&self, now: u64, window: Duration) -> bool {
        self.room_id.is_some() && within_reconnect_window(self.last_connected, now, window)
    }
}

/// True when `now - last_connected` is inside the reconnect window.
pub fn within_reconnect_window(last_connected: u64, now: u64, window: Duration) -> bool {
    now.saturating_sub(last_connected) < window.as_millis() as u64
}
