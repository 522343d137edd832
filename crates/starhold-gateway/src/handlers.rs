//! REST API endpoint handlers for the room gateway.
//!
//! All handlers operate on the in-memory room registry via the shared
//! [`AppState`]. Room creation and joining mutate the registry under
//! its write lock; the loop task owns the simulation itself and is
//! reached only through the room's signal channel.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/rooms` | Create a room |
//! | `GET` | `/api/rooms` | List all rooms |
//! | `GET` | `/api/rooms/:id` | Single room detail |
//! | `POST` | `/api/rooms/:id/join` | Join a lobby room |
//! | `POST` | `/api/rooms/:id/ready` | Mark a player ready |

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use starhold_core::room;
use starhold_types::{Player, PlayerId, PlayerKind, RoomId, RoomPhase};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::state::{self, AppState, RoomHandle};

// ---------------------------------------------------------------------------
// Request body structs
// ---------------------------------------------------------------------------

/// Body for the `POST /api/rooms` endpoint.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Display name for the room.
    pub name: String,
    /// Override the number of autonomous players (default from config).
    pub autonomous_players: Option<u32>,
    /// Override the map generation seed (default from config).
    pub map_seed: Option<u64>,
}

/// Body for the `POST /api/rooms/:id/join` endpoint.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Display name for the player.
    pub name: String,
    /// Requested territory color; assigned from the palette when omitted.
    pub color: Option<String>,
}

/// Body for the `POST /api/rooms/:id/ready` endpoint.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    /// The player marking themselves ready.
    pub player_id: PlayerId,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing gateway status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms = state.rooms.read().await;
    let total = rooms.len();
    let lobby = rooms
        .values()
        .filter(|r| r.phase == RoomPhase::Lobby)
        .count();
    let running = rooms
        .values()
        .filter(|r| r.phase == RoomPhase::Running)
        .count();
    let finished = rooms
        .values()
        .filter(|r| r.phase == RoomPhase::Finished)
        .count();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Starhold Gateway</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .method {{ color: #7ee787; font-weight: bold; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Starhold Gateway</h1>
    <p class="subtitle">Server-authoritative conquest rooms</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Rooms</div>
            <div class="value">{total}</div>
        </div>
        <div class="metric">
            <div class="label">Lobby</div>
            <div class="value">{lobby}</div>
        </div>
        <div class="metric">
            <div class="label">Running</div>
            <div class="value">{running}</div>
        </div>
        <div class="metric">
            <div class="label">Finished</div>
            <div class="value">{finished}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><span class="method">POST</span> <a href="/api/rooms">/api/rooms</a> -- Create a room</li>
        <li><span class="method">GET</span> <a href="/api/rooms">/api/rooms</a> -- List all rooms</li>
        <li><span class="method">GET</span> /api/rooms/:id -- Single room detail</li>
        <li><span class="method">POST</span> /api/rooms/:id/join -- Join a lobby room</li>
        <li><span class="method">POST</span> /api/rooms/:id/ready -- Mark a player ready</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li style="list-style:none;"><code>ws://host:port/ws/rooms/:id?player=:player_id</code> -- Snapshot, then live event stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// POST /api/rooms -- create a room
// ---------------------------------------------------------------------------

/// Create a lobby room from the configured defaults plus the request's
/// overrides.
///
/// Returns `201 Created` with the room id and the join path.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let mut config = state.defaults.clone();
    if let Some(autonomous) = body.autonomous_players {
        config.ai.autonomous_players = autonomous;
    }
    if let Some(seed) = body.map_seed {
        config.map.seed = seed;
    }
    config
        .validate()
        .map_err(|e| GatewayError::InvalidConfig(e.to_string()))?;

    let handle = RoomHandle::new(body.name, config);
    let response = serde_json::json!({
        "roomId": handle.id,
        "name": &handle.name,
        "phase": &handle.phase,
        "join": format!("/api/rooms/{}/join", handle.id),
    });
    state.rooms.write().await.insert(handle.id, handle);

    Ok((StatusCode::CREATED, Json(response)))
}

// ---------------------------------------------------------------------------
// GET /api/rooms -- list rooms
// ---------------------------------------------------------------------------

/// List all rooms with phase, roster size, and current tick.
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let rooms = state.rooms.read().await;

    let listing: Vec<serde_json::Value> = rooms
        .values()
        .map(|handle| {
            serde_json::json!({
                "roomId": handle.id,
                "name": &handle.name,
                "phase": &handle.phase,
                "players": handle.players.len(),
                "tick": handle.tick,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": listing.len(),
        "rooms": listing,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/rooms/:id -- single room detail
// ---------------------------------------------------------------------------

/// Return the full detail for a single room including the roster and,
/// once finished, the end-of-match summary.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = RoomId::from(parse_uuid(&id_str)?);

    let rooms = state.rooms.read().await;
    let handle = rooms
        .get(&id)
        .ok_or_else(|| GatewayError::RoomNotFound(format!("room {id}")))?;

    let players: Vec<&Player> = handle.players.values().collect();
    Ok(Json(serde_json::json!({
        "roomId": handle.id,
        "name": &handle.name,
        "phase": &handle.phase,
        "tick": handle.tick,
        "createdAt": handle.created_at,
        "players": players,
        "summary": &handle.summary,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/rooms/:id/join -- join a lobby room
// ---------------------------------------------------------------------------

/// Add a human player to a lobby room.
///
/// The player's color defaults to the next palette entry for their seat
/// position. Joining is only possible while the room is in the lobby.
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = RoomId::from(parse_uuid(&id_str)?);

    let mut rooms = state.rooms.write().await;
    let handle = rooms
        .get_mut(&id)
        .ok_or_else(|| GatewayError::RoomNotFound(format!("room {id}")))?;

    if handle.phase != RoomPhase::Lobby {
        return Err(GatewayError::RoomClosed(format!(
            "room {id} is {:?}",
            handle.phase
        )));
    }

    let position = handle.players.len();
    let player = Player {
        id: PlayerId::new(),
        name: body.name,
        color: body
            .color
            .unwrap_or_else(|| room::player_color(position)),
        kind: PlayerKind::Human,
        territories: BTreeSet::new(),
        eliminated: false,
        ready: false,
        joined_at: Utc::now(),
    };

    let response = serde_json::json!({
        "playerId": player.id,
        "name": &player.name,
        "color": &player.color,
        "ready": format!("/api/rooms/{id}/ready"),
    });
    handle.players.insert(player.id, player);

    Ok((StatusCode::CREATED, Json(response)))
}

// ---------------------------------------------------------------------------
// POST /api/rooms/:id/ready -- mark a player ready
// ---------------------------------------------------------------------------

/// Mark a player ready; when every human in the roster is ready the
/// room seats its autonomous players and the loop starts.
pub async fn ready_player(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(body): Json<ReadyRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id = RoomId::from(parse_uuid(&id_str)?);

    let mut rooms = state.rooms.write().await;
    let handle = rooms
        .get_mut(&id)
        .ok_or_else(|| GatewayError::RoomNotFound(format!("room {id}")))?;

    if handle.phase != RoomPhase::Lobby {
        return Err(GatewayError::RoomClosed(format!(
            "room {id} is {:?}",
            handle.phase
        )));
    }

    let player = handle
        .players
        .get_mut(&body.player_id)
        .ok_or_else(|| GatewayError::PlayerNotFound(format!("player {} in room {id}", body.player_id)))?;
    player.ready = true;

    let mut started = false;
    if handle.all_ready() {
        state::launch_room(&state, handle)?;
        started = true;
    }

    Ok(Json(serde_json::json!({
        "phase": &handle.phase,
        "started": started,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UUID from a string, returning a [`GatewayError`] on failure.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, GatewayError> {
    s.parse::<Uuid>()
        .map_err(|e| GatewayError::InvalidUuid(format!("{s}: {e}")))
}
