pub mod api;
pub mod broadcast;
pub mod config;
pub mod connections;
pub mod error;
pub mod janitor;
pub mod registry;
pub mod router;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
pub use janitor::spawn_janitor;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/", axum::routing::get(api::health))
        .route("/health", axum::routing::get(api::health))
        .route("/stats", axum::routing::get(api::stats))
        .route("/rooms", axum::routing::post(api::create_room))
        .route("/rooms/join", axum::routing::post(api::join_room))
        .route("/rooms/{room_id}", axum::routing::get(api::get_room))
        .route(
            "/rooms/{room_id}/start",
            axum::routing::post(api::start_room),
        )
        .route(
            "/rooms/{room_id}/players/{player_id}",
            axum::routing::delete(api::leave_room),
        )
        .route(
            "/players/{player_id}/room",
            axum::routing::get(api::player_room),
        )
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
