//! Error types for the room gateway.
//!
//! [`GatewayError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use starhold_core::room::RoomError;

/// Errors that can occur in the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The requested room does not exist.
    #[error("not found: {0}")]
    RoomNotFound(String),

    /// The named player is not on the room's roster.
    #[error("not found: {0}")]
    PlayerNotFound(String),

    /// The room is past the lobby phase and refuses the operation.
    #[error("room closed: {0}")]
    RoomClosed(String),

    /// A configuration override produced an invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A UUID could not be parsed from the request.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Room setup failed while moving a lobby into the running phase.
    #[error("room setup failed: {0}")]
    Setup(#[from] RoomError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::RoomNotFound(msg) | Self::PlayerNotFound(msg) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            Self::RoomClosed(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InvalidConfig(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Setup(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("setup error: {e}")),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
