use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use doodlechain_core::room::{
    Room, MAX_PLAYERS_RANGE, MAX_ROUNDS_RANGE, PLAYER_NAME_MAX, ROOM_NAME_MAX, TIME_LIMIT_RANGE,
};

use crate::connections::ConnectionStats;
use crate::error::AppError;
use crate::registry::{JoinError, RegistryStats, RoomSettings};
use crate::state::AppState;

/// Envelope for every successful API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Create-room body. Every field is required, matching the original
/// schema; defaults live in the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub player_name: String,
    pub room_name: String,
    pub max_players: u8,
    pub max_rounds: u8,
    pub time_limit: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub player_name: String,
    pub room_id: String,
}

/// Room plus the caller's identity within it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembership {
    pub room: Room,
    pub player_id: String,
    pub is_host: bool,
}

#[derive(Debug, Serialize)]
pub struct RoomBody {
    pub room: Room,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub rooms: RegistryStats,
    pub connections: ConnectionStats,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub version: &'static str,
}

// Length limits are in characters, not bytes; names may be multibyte.
fn validate_player_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim().to_string();
    if name.is_empty()
        || name.chars().count() > PLAYER_NAME_MAX
        || name.chars().any(char::is_control)
    {
        return Err(AppError::BadRequest("Invalid player name".to_string()));
    }
    Ok(name)
}

/// POST /rooms — create a room with the caller as host.
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoomMembership>>), AppError> {
    let player_name = validate_player_name(&body.player_name)?;

    let room_name = body.room_name.trim().to_string();
    if room_name.is_empty()
        || room_name.chars().count() > ROOM_NAME_MAX
        || room_name.chars().any(char::is_control)
    {
        return Err(AppError::BadRequest("Invalid room name".to_string()));
    }
    if !MAX_PLAYERS_RANGE.contains(&body.max_players) {
        return Err(AppError::BadRequest(format!(
            "maxPlayers must be between {} and {}",
            MAX_PLAYERS_RANGE.start(),
            MAX_PLAYERS_RANGE.end()
        )));
    }
    if !MAX_ROUNDS_RANGE.contains(&body.max_rounds) {
        return Err(AppError::BadRequest(format!(
            "maxRounds must be between {} and {}",
            MAX_ROUNDS_RANGE.start(),
            MAX_ROUNDS_RANGE.end()
        )));
    }
    if !TIME_LIMIT_RANGE.contains(&body.time_limit) {
        return Err(AppError::BadRequest(format!(
            "timeLimit must be between {} and {}",
            TIME_LIMIT_RANGE.start(),
            TIME_LIMIT_RANGE.end()
        )));
    }

    let (room, player_id) = {
        let mut registry = state.registry.write().await;
        registry.create_room(
            player_name,
            RoomSettings {
                name: room_name,
                max_players: body.max_players,
                max_rounds: body.max_rounds,
                time_limit: body.time_limit,
            },
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: RoomMembership {
                room,
                player_id,
                is_host: true,
            },
        }),
    ))
}

/// POST /rooms/join — join an existing room by id.
pub async fn join_room(
    State(state): State<AppState>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<ApiResponse<RoomMembership>>, AppError> {
    let player_name = validate_player_name(&body.player_name)?;

    let result = {
        let mut registry = state.registry.write().await;
        registry.join_room(player_name, &body.room_id)
    };
    match result {
        Ok((room, player_id)) => Ok(ApiResponse::ok(RoomMembership {
            room,
            player_id,
            is_host: false,
        })),
        Err(JoinError::NotFound) => Err(AppError::NotFound(JoinError::NotFound.to_string())),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

/// GET /rooms/{room_id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<RoomBody>>, AppError> {
    let room = {
        let registry = state.registry.read().await;
        registry.get_room(&room_id)
    };
    match room {
        Some(room) => Ok(ApiResponse::ok(RoomBody { room })),
        None => Err(AppError::NotFound("Room not found".to_string())),
    }
}

/// GET /players/{player_id}/room — look up the room a player is in.
pub async fn player_room(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<ApiResponse<RoomMembership>>, AppError> {
    let room = {
        let registry = state.registry.read().await;
        registry.room_for_player(&player_id)
    };
    match room {
        Some(room) => {
            let is_host = room.player(&player_id).is_some_and(|p| p.is_host);
            Ok(ApiResponse::ok(RoomMembership {
                room,
                player_id,
                is_host,
            }))
        }
        None => Err(AppError::NotFound("Player not in a room".to_string())),
    }
}

/// DELETE /rooms/{room_id}/players/{player_id} — remove a player out
/// of band, e.g. a client that lost its socket but can still reach the
/// API. Members learn of the change on their next room snapshot.
pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Option<Room>>>, AppError> {
    let removed = {
        let mut registry = state.registry.write().await;
        let belongs = registry
            .room_for_player(&player_id)
            .is_some_and(|room| room.id == room_id);
        if !belongs {
            return Err(AppError::NotFound("Player not in this room".to_string()));
        }
        registry.remove_player(&player_id)
    };
    // None means the room emptied and was deleted.
    Ok(ApiResponse::ok(removed))
}

/// POST /rooms/{room_id}/start
pub async fn start_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<RoomBody>>, AppError> {
    let room = {
        let mut registry = state.registry.write().await;
        if registry.get_room(&room_id).is_none() {
            return Err(AppError::NotFound("Room not found".to_string()));
        }
        if !registry.start_game(&room_id) {
            return Err(AppError::BadRequest("Failed to start game".to_string()));
        }
        registry.get_room(&room_id)
    };
    match room {
        Some(room) => Ok(ApiResponse::ok(RoomBody { room })),
        None => Err(AppError::NotFound("Room not found".to_string())),
    }
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<ApiResponse<StatsBody>> {
    let rooms = state.registry.read().await.stats();
    let connections = state.connections.read().await.stats();
    ApiResponse::ok(StatsBody { rooms, connections })
}

/// GET /health and GET /
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
