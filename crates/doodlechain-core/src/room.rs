use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::{Player, PlayerId};

/// Opaque unique room identifier.
pub type RoomId = String;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// A bounded group of players sharing one game session.
/// `players` is kept in join order; the first surviving player is the
/// host-succession candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub players: Vec<Player>,
    pub max_players: u8,
    pub status: RoomStatus,
    pub current_round: u8,
    pub max_rounds: u8,
    pub current_player_index: usize,
    /// Per-turn time limit in seconds.
    pub time_limit: u16,
}

impl Room {
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }
}

/// Accepted settings ranges, enforced at the HTTP boundary.
pub const PLAYER_NAME_MAX: usize = 20;
pub const ROOM_NAME_MAX: usize = 30;
pub const MAX_PLAYERS_RANGE: std::ops::RangeInclusive<u8> = 2..=10;
pub const MAX_ROUNDS_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
pub const TIME_LIMIT_RANGE: std::ops::RangeInclusive<u16> = 10..=300;

/// Generate a fresh room id.
pub fn generate_room_id() -> RoomId {
    format!("room_{}", Uuid::new_v4().simple())
}

/// Generate a fresh player id.
pub fn generate_player_id() -> PlayerId {
    format!("player_{}", Uuid::new_v4().simple())
}
