//! Integration tests for the gateway API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use starhold_core::config::EngineConfig;
use starhold_gateway::router::build_router;
use starhold_gateway::state::AppState;
use tower::ServiceExt;

/// Defaults shrunk for tests: a small fixed-seed map, a fast tick, and
/// a single autonomous player, so a launched room keeps running while
/// assertions execute.
fn make_test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.simulation.tick_interval_ms = 50;
    config.map.territory_count = 16;
    config.map.seed = 7;
    config.ai.autonomous_players = 1;
    config
}

fn make_test_state() -> Arc<AppState> {
    Arc::new(AppState::new(make_test_config()))
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a room named `Frontier` and return its id as a string.
async fn create_test_room(state: &Arc<AppState>) -> String {
    let response = build_router(Arc::clone(state))
        .oneshot(post_json(
            "/api/rooms",
            &serde_json::json!({"name": "Frontier"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    json["roomId"].as_str().unwrap().to_owned()
}

/// Join a room and return the new player's id as a string.
async fn join_test_room(state: &Arc<AppState>, room_id: &str, name: &str) -> String {
    let path = format!("/api/rooms/{room_id}/join");
    let response = build_router(Arc::clone(state))
        .oneshot(post_json(&path, &serde_json::json!({"name": name})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    json["playerId"].as_str().unwrap().to_owned()
}

/// Mark a player ready and return the response JSON.
async fn ready_test_player(state: &Arc<AppState>, room_id: &str, player_id: &str) -> Value {
    let path = format!("/api/rooms/{room_id}/ready");
    let response = build_router(Arc::clone(state))
        .oneshot(post_json(&path, &serde_json::json!({"playerId": player_id})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_to_json(response.into_body()).await
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state();
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_create_room() {
    let state = make_test_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            "/api/rooms",
            &serde_json::json!({"name": "Frontier", "mapSeed": 99}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    let room_id = json["roomId"].as_str().unwrap();
    assert!(room_id.parse::<uuid::Uuid>().is_ok());
    assert_eq!(json["phase"], "Lobby");
    assert_eq!(
        json["join"].as_str().unwrap(),
        format!("/api/rooms/{room_id}/join")
    );
}

#[tokio::test]
async fn test_join_assigns_palette_colors_in_seat_order() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;

    let path = format!("/api/rooms/{room_id}/join");
    let first = build_router(Arc::clone(&state))
        .oneshot(post_json(&path, &serde_json::json!({"name": "Ada"})))
        .await
        .unwrap();
    let first_json = body_to_json(first.into_body()).await;
    assert_eq!(first_json["color"], "#e6194b");

    let second = build_router(Arc::clone(&state))
        .oneshot(post_json(&path, &serde_json::json!({"name": "Brin"})))
        .await
        .unwrap();
    let second_json = body_to_json(second.into_body()).await;
    assert_eq!(second_json["color"], "#3cb44b");

    assert_ne!(first_json["playerId"], second_json["playerId"]);
}

#[tokio::test]
async fn test_join_respects_requested_color() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;

    let path = format!("/api/rooms/{room_id}/join");
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &path,
            &serde_json::json!({"name": "Ada", "color": "#123456"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["color"], "#123456");
}

#[tokio::test]
async fn test_join_unknown_room_returns_404() {
    let state = make_test_state();
    let fake_id = uuid::Uuid::now_v7();

    let response = build_router(state)
        .oneshot(post_json(
            &format!("/api/rooms/{fake_id}/join"),
            &serde_json::json!({"name": "Ada"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_join_invalid_uuid_returns_400() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(post_json(
            "/api/rooms/not-a-uuid/join",
            &serde_json::json!({"name": "Ada"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ready_unknown_player_returns_404() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    let fake_player = uuid::Uuid::now_v7();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/rooms/{room_id}/ready"),
            &serde_json::json!({"playerId": fake_player}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_ready_keeps_the_lobby() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    let ada = join_test_room(&state, &room_id, "Ada").await;
    let _brin = join_test_room(&state, &room_id, "Brin").await;

    let json = ready_test_player(&state, &room_id, &ada).await;
    assert_eq!(json["started"], false);
    assert_eq!(json["phase"], "Lobby");
}

#[tokio::test]
async fn test_all_ready_starts_the_room() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    let ada = join_test_room(&state, &room_id, "Ada").await;

    let json = ready_test_player(&state, &room_id, &ada).await;
    assert_eq!(json["started"], true);
    assert_eq!(json["phase"], "Running");

    // The detail endpoint shows the seated roster: one human plus the
    // configured autonomous player.
    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::get(&format!("/api/rooms/{room_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_to_json(response.into_body()).await;
    assert_eq!(detail["phase"], "Running");
    assert_eq!(detail["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_join_after_start_returns_409() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    let ada = join_test_room(&state, &room_id, "Ada").await;
    ready_test_player(&state, &room_id, &ada).await;

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/rooms/{room_id}/join"),
            &serde_json::json!({"name": "Brin"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_ready_after_start_returns_409() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    let ada = join_test_room(&state, &room_id, "Ada").await;
    ready_test_player(&state, &room_id, &ada).await;

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/rooms/{room_id}/ready"),
            &serde_json::json!({"playerId": ada}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_overfull_room_fails_to_launch_and_stays_in_the_lobby() {
    let state = make_test_state();

    // More seats than the 16-territory test map can hold.
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            "/api/rooms",
            &serde_json::json!({"name": "Cramped", "autonomousPlayers": 200}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let room_id = body_to_json(response.into_body()).await["roomId"]
        .as_str()
        .unwrap()
        .to_owned();

    let ada = join_test_room(&state, &room_id, "Ada").await;
    let response = build_router(Arc::clone(&state))
        .oneshot(post_json(
            &format!("/api/rooms/{room_id}/ready"),
            &serde_json::json!({"playerId": ada}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::get(&format!("/api/rooms/{room_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let detail = body_to_json(response.into_body()).await;
    assert_eq!(detail["phase"], "Lobby");
}

#[tokio::test]
async fn test_list_rooms() {
    let state = make_test_state();
    create_test_room(&state).await;
    create_test_room(&state).await;

    let response = build_router(Arc::clone(&state))
        .oneshot(Request::get("/api/rooms").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["rooms"][0]["phase"], "Lobby");
}

#[tokio::test]
async fn test_get_room_detail() {
    let state = make_test_state();
    let room_id = create_test_room(&state).await;
    join_test_room(&state, &room_id, "Ada").await;

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::get(&format!("/api/rooms/{room_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Frontier");
    assert_eq!(json["phase"], "Lobby");
    assert_eq!(json["tick"], 0);
    assert_eq!(json["players"].as_array().unwrap().len(), 1);
    assert_eq!(json["players"][0]["name"], "Ada");
    assert!(json["createdAt"].is_string());
    assert!(json["summary"].is_null());
}

#[tokio::test]
async fn test_get_room_not_found() {
    let state = make_test_state();
    let fake_id = uuid::Uuid::now_v7();

    let response = build_router(state)
        .oneshot(
            Request::get(&format!("/api/rooms/{fake_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(
            Request::get("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
