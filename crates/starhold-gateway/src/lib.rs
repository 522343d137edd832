//! Room gateway for the Starhold conquest engine.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/rooms/:id`) streaming each room's
//!   snapshot, deltas, combat results, and private rejection notices
//!   via [`tokio::sync::broadcast`], and accepting player commands as
//!   inbound JSON frames
//! - **REST endpoints** for creating rooms, joining their lobbies,
//!   readying up, and inspecting room state
//! - **Minimal HTML status page** (`GET /`) showing room counts and
//!   links to API endpoints
//!
//! # Architecture
//!
//! Every room lives in the in-memory [`AppState`] registry. A lobby
//! room is just a roster and a pair of channels; once every human is
//! ready the gateway seats the autonomous players and spawns the
//! room's loop task, which owns the simulation outright. From then on
//! handlers and sockets reach the room only through its signal channel
//! and observe it through its broadcast channel plus the registry
//! mirror the loop refreshes each tick.
//!
//! [`AppState`]: state::AppState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::GatewayError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, RoomHandle};
