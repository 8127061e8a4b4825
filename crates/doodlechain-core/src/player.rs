use serde::{Deserialize, Serialize};

/// Opaque unique player identifier.
pub type PlayerId = String;

/// A player inside a Doodlechain room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub presence: Presence,
}

/// Connection liveness of a player. Disconnection is not departure:
/// a disconnected player keeps their room slot until they leave
/// explicitly or the janitor reclaims the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Presence {
    Connected,
    Disconnected {
        /// Unix millis at which the transport dropped.
        since: u64,
    },
}

impl Presence {
    pub fn is_connected(&self) -> bool {
        matches!(self, Presence::Connected)
    }

    /// Disconnect timestamp, when disconnected.
    pub fn disconnected_since(&self) -> Option<u64> {
        match self {
            Presence::Connected => None,
            Presence::Disconnected { since } => Some(*since),
        }
    }
}

impl Player {
    pub fn is_connected(&self) -> bool {
        self.presence.is_connected()
    }
}
