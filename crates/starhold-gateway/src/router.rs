//! Axum router construction for the gateway API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin client access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the gateway.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/rooms/:id` -- `WebSocket` room event stream
/// - `POST /api/rooms` -- create a room
/// - `GET /api/rooms` -- list rooms
/// - `GET /api/rooms/:id` -- single room detail
/// - `POST /api/rooms/:id/join` -- join a lobby room
/// - `POST /api/rooms/:id/ready` -- mark a player ready
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/rooms/{id}", get(ws::ws_room))
        // REST API
        .route(
            "/api/rooms",
            get(handlers::list_rooms).post(handlers::create_room),
        )
        .route("/api/rooms/{id}", get(handlers::get_room))
        .route("/api/rooms/{id}/join", post(handlers::join_room))
        .route("/api/rooms/{id}/ready", post(handlers::ready_player))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
