use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use doodlechain_core::player::{Player, PlayerId, Presence};
use doodlechain_core::room::{generate_player_id, generate_room_id, Room, RoomId, RoomStatus};

/// Settings for a new room, already range-validated at the boundary.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub name: String,
    pub max_players: u8,
    pub max_rounds: u8,
    pub time_limit: u16,
}

/// Why a join attempt was rejected. Reported to the requester only;
/// no state is mutated on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    NotFound,
    Full,
    AlreadyStarted,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Room not found"),
            Self::Full => write!(f, "Room is full"),
            Self::AlreadyStarted => write!(f, "Game already started"),
        }
    }
}

/// Counts for the stats endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_rooms: usize,
    pub total_players: usize,
    pub waiting_rooms: usize,
    pub playing_rooms: usize,
}

/// Authoritative store of rooms and the player→room index.
///
/// Both maps are mutated only through the operations below, so the
/// index can never drift from the room contents. Callers serialize
/// access through the shared lock in `AppState`; the registry itself
/// does no I/O.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    player_index: HashMap<PlayerId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with its host as the only member. The host joins
    /// connected; validation of name/settings ranges happens at the
    /// HTTP boundary.
    pub fn create_room(&mut self, host_name: String, settings: RoomSettings) -> (Room, PlayerId) {
        let room_id = generate_room_id();
        let player_id = generate_player_id();

        let host = Player {
            id: player_id.clone(),
            name: host_name,
            is_host: true,
            presence: Presence::Connected,
        };
        let room = Room {
            id: room_id.clone(),
            name: settings.name,
            players: vec![host],
            max_players: settings.max_players,
            status: RoomStatus::Waiting,
            current_round: 0,
            max_rounds: settings.max_rounds,
            current_player_index: 0,
            time_limit: settings.time_limit,
        };

        self.rooms.insert(room_id.clone(), room.clone());
        self.player_index.insert(player_id.clone(), room_id.clone());

        tracing::info!(room = %room_id, host = %room.players[0].name, "Room created");
        (room, player_id)
    }

    /// Append a new player to a waiting, non-full room.
    pub fn join_room(
        &mut self,
        player_name: String,
        room_id: &str,
    ) -> Result<(Room, PlayerId), JoinError> {
        let room = self.rooms.get_mut(room_id).ok_or(JoinError::NotFound)?;
        if room.is_full() {
            return Err(JoinError::Full);
        }
        if room.status != RoomStatus::Waiting {
            return Err(JoinError::AlreadyStarted);
        }

        let player_id = generate_player_id();
        room.players.push(Player {
            id: player_id.clone(),
            name: player_name,
            is_host: false,
            presence: Presence::Connected,
        });
        self.player_index
            .insert(player_id.clone(), room_id.to_string());

        tracing::info!(room = %room_id, player = %player_id, "Player joined room");
        Ok((self.rooms[room_id].clone(), player_id))
    }

    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).cloned()
    }

    pub fn room_for_player(&self, player_id: &str) -> Option<Room> {
        let room_id = self.player_index.get(player_id)?;
        self.rooms.get(room_id).cloned()
    }

    /// Remove a player from their room. Deletes the room when it
    /// empties (returns None — there is nobody left to notify). When
    /// the departing player was the host, the earliest-joined survivor
    /// is promoted within the same operation, so no observer ever sees
    /// a hostless room.
    pub fn remove_player(&mut self, player_id: &str) -> Option<Room> {
        let room_id = self.player_index.remove(player_id)?;
        let room = self.rooms.get_mut(&room_id)?;

        room.players.retain(|p| p.id != player_id);

        if room.players.is_empty() {
            self.rooms.remove(&room_id);
            tracing::info!(room = %room_id, "Room deleted (last player left)");
            return None;
        }

        if !room.players.iter().any(|p| p.is_host) {
            room.players[0].is_host = true;
            tracing::info!(room = %room_id, host = %room.players[0].name, "New host assigned");
        }

        tracing::info!(room = %room_id, player = %player_id, "Player removed from room");
        Some(room.clone())
    }

    /// Update a player's connection liveness. Disconnection does not
    /// remove the player; it only records when the transport dropped.
    pub fn set_connection_state(
        &mut self,
        player_id: &str,
        connected: bool,
        now: u64,
    ) -> Option<Room> {
        let room_id = self.player_index.get(player_id)?;
        let room = self.rooms.get_mut(room_id)?;
        let player = room.players.iter_mut().find(|p| p.id == player_id)?;

        player.presence = if connected {
            Presence::Connected
        } else {
            Presence::Disconnected { since: now }
        };
        Some(room.clone())
    }

    /// Transition a waiting room with at least two players into play.
    /// Returns false (no mutation) otherwise.
    pub fn start_game(&mut self, room_id: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if room.status != RoomStatus::Waiting || room.players.len() < 2 {
            return false;
        }

        room.status = RoomStatus::Playing;
        room.current_round = 1;
        room.current_player_index = 0;

        tracing::info!(room = %room_id, players = room.players.len(), "Game started");
        true
    }

    /// Reclaim rooms whose members have all been silent past
    /// `staleness`. A room with any connected member is never stale;
    /// otherwise its last activity is the newest disconnect time.
    /// Returns the number of rooms removed.
    pub fn sweep_stale(&mut self, now: u64, staleness: Duration) -> usize {
        let staleness_ms = staleness.as_millis() as u64;
        let stale: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| {
                if room.players.iter().any(Player::is_connected) {
                    return false;
                }
                let last_activity = room
                    .players
                    .iter()
                    .filter_map(|p| p.presence.disconnected_since())
                    .max()
                    .unwrap_or(0);
                now.saturating_sub(last_activity) > staleness_ms
            })
            .map(|room| room.id.clone())
            .collect();

        for room_id in &stale {
            if let Some(room) = self.rooms.remove(room_id) {
                for player in &room.players {
                    self.player_index.remove(&player.id);
                }
                tracing::info!(room = %room_id, "Stale room reclaimed");
            }
        }
        stale.len()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_rooms: self.rooms.len(),
            total_players: self.player_index.len(),
            waiting_rooms: self
                .rooms
                .values()
                .filter(|r| r.status == RoomStatus::Waiting)
                .count(),
            playing_rooms: self
                .rooms
                .values()
                .filter(|r| r.status == RoomStatus::Playing)
                .count(),
        }
    }

    /// Check that the player index and room contents agree, in both
    /// directions.
    #[cfg(test)]
    fn assert_index_consistent(&self) {
        for (player_id, room_id) in &self.player_index {
            let room = self
                .rooms
                .get(room_id)
                .unwrap_or_else(|| panic!("index points at missing room {room_id}"));
            assert!(
                room.players.iter().any(|p| &p.id == player_id),
                "index maps {player_id} to {room_id} but the room does not contain them"
            );
        }
        for room in self.rooms.values() {
            for player in &room.players {
                assert_eq!(
                    self.player_index.get(&player.id),
                    Some(&room.id),
                    "player {} in room {} missing from index",
                    player.id,
                    room.id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_players: u8) -> RoomSettings {
        RoomSettings {
            name: "doodle night".to_string(),
            max_players,
            max_rounds: 3,
            time_limit: 60,
        }
    }

    #[test]
    fn create_room_inserts_host() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));

        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].is_host);
        assert!(room.players[0].is_connected());
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.current_round, 0);
        assert_eq!(registry.room_for_player(&host_id).unwrap().id, room.id);
        registry.assert_index_consistent();
    }

    #[test]
    fn join_room_appends_in_order() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));

        let (room, bob_id) = registry
            .join_room("Bob".to_string(), &room.id)
            .unwrap();
        let (room, carol_id) = registry
            .join_room("Carol".to_string(), &room.id)
            .unwrap();

        assert_eq!(room.players.len(), 3);
        assert_eq!(room.players[1].id, bob_id);
        assert_eq!(room.players[2].id, carol_id);
        assert!(!room.players[1].is_host);
        registry.assert_index_consistent();
    }

    #[test]
    fn join_nonexistent_room_fails() {
        let mut registry = RoomRegistry::new();
        assert_eq!(
            registry.join_room("Bob".to_string(), "room_missing"),
            Err(JoinError::NotFound)
        );
    }

    #[test]
    fn join_full_room_never_appends() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(2));
        registry.join_room("Bob".to_string(), &room.id).unwrap();

        assert_eq!(
            registry.join_room("Carol".to_string(), &room.id),
            Err(JoinError::Full)
        );
        assert_eq!(registry.get_room(&room.id).unwrap().players.len(), 2);
        registry.assert_index_consistent();
    }

    #[test]
    fn join_started_room_fails() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));
        registry.join_room("Bob".to_string(), &room.id).unwrap();
        assert!(registry.start_game(&room.id));

        assert_eq!(
            registry.join_room("Carol".to_string(), &room.id),
            Err(JoinError::AlreadyStarted)
        );
    }

    #[test]
    fn remove_last_player_deletes_room() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));

        assert!(registry.remove_player(&host_id).is_none());
        assert!(registry.get_room(&room.id).is_none());
        assert!(registry.room_for_player(&host_id).is_none());
        registry.assert_index_consistent();
    }

    #[test]
    fn remove_non_last_player_keeps_room() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));
        let (_, bob_id) = registry.join_room("Bob".to_string(), &room.id).unwrap();

        let updated = registry.remove_player(&bob_id).unwrap();
        assert_eq!(updated.players.len(), 1);
        assert!(registry.get_room(&room.id).is_some());
        registry.assert_index_consistent();
    }

    #[test]
    fn host_leaving_promotes_earliest_joined_survivor() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));
        let (_, bob_id) = registry.join_room("Bob".to_string(), &room.id).unwrap();
        registry.join_room("Carol".to_string(), &room.id).unwrap();

        let updated = registry.remove_player(&host_id).unwrap();
        let hosts: Vec<_> = updated.players.iter().filter(|p| p.is_host).collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].id, bob_id);
        registry.assert_index_consistent();
    }

    #[test]
    fn non_host_leaving_does_not_reassign() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));
        let (_, bob_id) = registry.join_room("Bob".to_string(), &room.id).unwrap();

        let updated = registry.remove_player(&bob_id).unwrap();
        assert_eq!(updated.host().unwrap().id, host_id);
    }

    #[test]
    fn remove_unknown_player_is_none() {
        let mut registry = RoomRegistry::new();
        assert!(registry.remove_player("player_missing").is_none());
    }

    #[test]
    fn start_game_requires_waiting_and_two_players() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));

        // One player: refused, no mutation.
        assert!(!registry.start_game(&room.id));
        assert_eq!(registry.get_room(&room.id).unwrap().status, RoomStatus::Waiting);

        registry.join_room("Bob".to_string(), &room.id).unwrap();
        assert!(registry.start_game(&room.id));

        let started = registry.get_room(&room.id).unwrap();
        assert_eq!(started.status, RoomStatus::Playing);
        assert_eq!(started.current_round, 1);
        assert_eq!(started.current_player_index, 0);

        // Already playing: refused, round counter untouched.
        assert!(!registry.start_game(&room.id));
        assert_eq!(registry.get_room(&room.id).unwrap().current_round, 1);
    }

    #[test]
    fn start_nonexistent_room_fails() {
        let mut registry = RoomRegistry::new();
        assert!(!registry.start_game("room_missing"));
    }

    #[test]
    fn disconnect_sets_presence_without_removal() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));

        let updated = registry.set_connection_state(&host_id, false, 5_000).unwrap();
        let player = updated.player(&host_id).unwrap();
        assert!(!player.is_connected());
        assert_eq!(player.presence.disconnected_since(), Some(5_000));
        assert!(registry.get_room(&room.id).is_some());

        let updated = registry.set_connection_state(&host_id, true, 9_000).unwrap();
        let player = updated.player(&host_id).unwrap();
        assert!(player.is_connected());
        assert_eq!(player.presence.disconnected_since(), None);
    }

    #[test]
    fn sweep_reclaims_fully_disconnected_stale_rooms() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));
        let (_, bob_id) = registry.join_room("Bob".to_string(), &room.id).unwrap();

        // All members disconnected 31 minutes before the sweep.
        let staleness = Duration::from_secs(30 * 60);
        let disconnect_at = 1_000_000;
        registry.set_connection_state(&host_id, false, disconnect_at).unwrap();
        registry.set_connection_state(&bob_id, false, disconnect_at).unwrap();

        let now = disconnect_at + 31 * 60 * 1000;
        assert_eq!(registry.sweep_stale(now, staleness), 1);
        assert!(registry.get_room(&room.id).is_none());
        assert!(registry.room_for_player(&host_id).is_none());
        assert!(registry.room_for_player(&bob_id).is_none());
        registry.assert_index_consistent();
    }

    #[test]
    fn sweep_spares_rooms_within_staleness() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(4));
        registry.set_connection_state(&host_id, false, 1_000_000).unwrap();

        let staleness = Duration::from_secs(30 * 60);
        let now = 1_000_000 + 29 * 60 * 1000;
        assert_eq!(registry.sweep_stale(now, staleness), 0);
        assert!(registry.get_room(&room.id).is_some());
    }

    #[test]
    fn room_with_a_connected_member_is_never_stale() {
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));
        let (_, bob_id) = registry.join_room("Bob".to_string(), &room.id).unwrap();

        // Bob disconnected ages ago; Alice never did. The connected
        // member keeps the room alive regardless of Bob's timestamp.
        registry.set_connection_state(&bob_id, false, 0).unwrap();
        let far_future = u64::MAX / 2;
        assert_eq!(registry.sweep_stale(far_future, Duration::from_secs(1)), 0);
        assert!(registry.get_room(&room.id).is_some());
    }

    #[test]
    fn freshly_created_room_survives_sweep() {
        // All members connected, no disconnect timestamps at all: the
        // room must not fall back to treating epoch 0 as last activity.
        let mut registry = RoomRegistry::new();
        let (room, _) = registry.create_room("Alice".to_string(), settings(4));

        assert_eq!(
            registry.sweep_stale(u64::MAX / 2, Duration::from_secs(1)),
            0
        );
        assert!(registry.get_room(&room.id).is_some());
    }

    #[test]
    fn index_holds_through_join_leave_sequences() {
        let mut registry = RoomRegistry::new();
        let (room, host_id) = registry.create_room("Alice".to_string(), settings(10));

        let mut ids = vec![host_id];
        for i in 0..5 {
            let (_, id) = registry
                .join_room(format!("Player{i}"), &room.id)
                .unwrap();
            registry.assert_index_consistent();
            ids.push(id);
        }
        // Remove in an arbitrary interleaved order.
        for id in [&ids[2], &ids[0], &ids[4], &ids[1], &ids[5], &ids[3]] {
            let _ = registry.remove_player(id);
            registry.assert_index_consistent();
        }
        assert!(registry.get_room(&room.id).is_none());
    }

    #[test]
    fn stats_count_rooms_and_players() {
        let mut registry = RoomRegistry::new();
        let (room_a, _) = registry.create_room("Alice".to_string(), settings(4));
        registry.join_room("Bob".to_string(), &room_a.id).unwrap();
        registry.create_room("Carol".to_string(), settings(4));
        registry.start_game(&room_a.id);

        let stats = registry.stats();
        assert_eq!(stats.total_rooms, 2);
        assert_eq!(stats.total_players, 3);
        assert_eq!(stats.waiting_rooms, 1);
        assert_eq!(stats.playing_rooms, 1);
    }
}
