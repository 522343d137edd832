//! `WebSocket` handler for per-room event streaming.
//!
//! Clients attach to `GET /ws/rooms/:id?player=:player_id` and receive
//! the room's event stream as JSON text frames: a full snapshot on
//! attach, then deltas, combat results, and private rejection notices
//! as the loop emits them. Inbound text frames are parsed as
//! [`Command`]s and queued for the next tick boundary.
//!
//! Sockets without a `player` parameter attach as spectators: they see
//! the public stream and cannot issue commands. When a player socket
//! drops, the handler signals the loop, which neutralizes the player's
//! holdings.
//!
//! If a client falls behind, lagged events are silently skipped and
//! the client resumes from the most recent event.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use starhold_core::runner::RoomSignal;
use starhold_types::{
    Command, MatchSummary, PlayerId, QueuedCommand, RoomEvent, RoomId, RoomPhase,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::handlers::parse_uuid;
use crate::state::AppState;

/// Query parameters for the `GET /ws/rooms/:id` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct AttachQuery {
    /// The subscribing player's id; omit to attach as a spectator.
    pub player: Option<String>,
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming the room's events.
///
/// # Route
///
/// `GET /ws/rooms/:id?player=:player_id`
///
/// # Errors
///
/// Returns [`GatewayError::RoomNotFound`] when the room id is unknown
/// and [`GatewayError::InvalidUuid`] when the path or query ids do not
/// parse.
pub async fn ws_room(
    ws: WebSocketUpgrade,
    Path(id_str): Path<String>,
    Query(params): Query<AttachQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let room_id = RoomId::from(parse_uuid(&id_str)?);
    let viewer = params
        .player
        .as_deref()
        .map(parse_uuid)
        .transpose()?
        .map(PlayerId::from);

    let rooms = state.rooms.read().await;
    let handle = rooms
        .get(&room_id)
        .ok_or_else(|| GatewayError::RoomNotFound(format!("room {room_id}")))?;

    let events = handle.events.subscribe();
    let signals = handle.signals.clone();
    let phase = handle.phase;
    let summary = handle.summary.clone();

    Ok(ws.on_upgrade(move |socket| stream_room(socket, events, signals, phase, summary, viewer)))
}

/// Handle the `WebSocket` lifecycle: deliver the attach snapshot, then
/// forward room events and queue inbound commands until either side
/// closes.
async fn stream_room(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<RoomEvent>,
    signals: mpsc::Sender<RoomSignal>,
    phase: RoomPhase,
    summary: Option<MatchSummary>,
    viewer: Option<PlayerId>,
) {
    debug!(?viewer, "WebSocket client connected");

    if phase == RoomPhase::Finished {
        // The match is over; deliver the stored report and close.
        if let Some(summary) = summary {
            send_event(&mut socket, &RoomEvent::MatchEnded(summary)).await;
        }
        return;
    }

    // A running loop answers a snapshot signal within one tick. Lobby
    // rooms skip the request; the loop's initial full-state broadcast
    // reaches this subscriber when the match starts.
    let mut snapshot_tick = 0;
    if phase == RoomPhase::Running {
        let (tx, rx) = oneshot::channel();
        if signals.try_send(RoomSignal::Snapshot(tx)).is_ok()
            && let Ok(snapshot) = rx.await
        {
            snapshot_tick = snapshot.tick;
            if !send_event(&mut socket, &RoomEvent::FullState(snapshot)).await {
                return;
            }
        }
    }

    let disconnected = loop {
        tokio::select! {
            // Receive a room event from the loop.
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if !visible(&event, viewer) {
                            continue;
                        }
                        // Deltas at or before the attach snapshot are
                        // already folded into it.
                        if let RoomEvent::DeltaState(delta) = &event
                            && delta.tick <= snapshot_tick
                        {
                            continue;
                        }
                        if !send_event(&mut socket, &event).await {
                            break true;
                        }
                        if matches!(event, RoomEvent::MatchEnded(_)) {
                            debug!("Match ended, closing stream");
                            break false;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event channel closed, shutting down WebSocket");
                        break false;
                    }
                }
            }
            // Inbound traffic: commands, pings, close frames.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        queue_command(&signals, viewer, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break true;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let pong = Message::Pong(data);
                        if socket.send(pong).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break true;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break true;
                    }
                    _ => {
                        // Ignore binary frames from the client.
                    }
                }
            }
        }
    };

    if disconnected
        && let Some(player) = viewer
        && signals.try_send(RoomSignal::Disconnect(player)).is_err()
    {
        debug!(%player, "Room loop already gone, disconnect signal dropped");
    }
}

/// Whether an event may be forwarded to this socket's viewer.
///
/// Spectator sockets see everything except private rejection notices.
fn visible(event: &RoomEvent, viewer: Option<PlayerId>) -> bool {
    viewer.map_or(
        !matches!(event, RoomEvent::CommandRejected(_)),
        |id| event.visible_to(id),
    )
}

/// Parse an inbound text frame as a [`Command`] and queue it for the
/// next tick.
///
/// Spectator sockets cannot issue commands. Malformed frames and a
/// full signal channel are logged and dropped; feedback for well-formed
/// but invalid commands arrives as a rejection notice on the event
/// stream.
fn queue_command(signals: &mpsc::Sender<RoomSignal>, viewer: Option<PlayerId>, text: &str) {
    let Some(player_id) = viewer else {
        debug!("Ignoring command from spectator socket");
        return;
    };

    match serde_json::from_str::<Command>(text) {
        Ok(command) => {
            let queued = QueuedCommand { player_id, command };
            if signals.try_send(RoomSignal::Command(queued)).is_err() {
                warn!(%player_id, "Command dropped: signal channel full or closed");
            }
        }
        Err(e) => {
            debug!(%player_id, "Malformed command frame: {e}");
        }
    }
}

/// Serialize and send one event as a text frame.
///
/// Returns `false` when the socket is gone; serialization failures are
/// logged and skipped without ending the stream.
async fn send_event(socket: &mut WebSocket, event: &RoomEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize room event: {e}");
            return true;
        }
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        debug!("WebSocket client disconnected (send failed)");
        return false;
    }
    true
}
