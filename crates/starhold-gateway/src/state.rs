//! Shared application state: the room registry and per-room handles.
//!
//! [`AppState`] owns every registered room. Each [`RoomHandle`] carries
//! the room's lobby roster, its event broadcast sender, and the signal
//! sender the loop drains; the signal *receiver* waits in the handle
//! until the room launches, then moves into the spawned loop task.
//!
//! REST handlers read and mutate the registry under one `RwLock`. The
//! running loop writes back through [`RegistryObserver`], which uses
//! `try_write` so a REST read in flight never blocks a tick; a skipped
//! update is caught on the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use starhold_core::config::EngineConfig;
use starhold_core::room::{self, RoomError};
use starhold_core::runner::{self, RoomSignal, TickObserver};
use starhold_core::store::StateStore;
use starhold_core::tick::{RoomState, TickSummary};
use starhold_types::{EndReason, MatchSummary, Player, PlayerId, RoomEvent, RoomId, RoomPhase};
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{error, info};

/// Capacity of each room's event broadcast channel.
///
/// A subscriber that falls behind by more than this many events
/// receives a [`broadcast::error::RecvError::Lagged`] and skips to the
/// newest event.
pub const BROADCAST_CAPACITY: usize = 256;

/// Capacity of each room's inbound signal channel.
///
/// Commands beyond this backlog are dropped by the socket task; the
/// loop drains the channel at every tick boundary.
pub const SIGNAL_CAPACITY: usize = 256;

/// One registered room: roster, channels, phase, and live counters.
#[derive(Debug)]
pub struct RoomHandle {
    /// The room's identifier.
    pub id: RoomId,
    /// Display name the room was created with.
    pub name: String,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Engine configuration the room will run (defaults + overrides).
    pub config: EngineConfig,
    /// Roster, keyed by player id. Humans only while in the lobby;
    /// replaced with the full seated roster at launch and refreshed
    /// every tick while running.
    pub players: BTreeMap<PlayerId, Player>,
    /// Last completed tick (0 until the loop runs).
    pub tick: u64,
    /// Event fan-out to every subscribed socket.
    pub events: broadcast::Sender<RoomEvent>,
    /// Signal sender cloned into each socket task.
    pub signals: mpsc::Sender<RoomSignal>,
    /// Signal receiver, parked here until launch moves it into the loop.
    pending_signals: Option<mpsc::Receiver<RoomSignal>>,
    /// End-of-match report, present once the room is finished.
    pub summary: Option<MatchSummary>,
    /// Server time the room was created.
    pub created_at: DateTime<Utc>,
}

impl RoomHandle {
    /// Create a lobby-phase room with fresh channels.
    pub fn new(name: String, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (signals, pending) = mpsc::channel(SIGNAL_CAPACITY);
        Self {
            id: RoomId::new(),
            name,
            phase: RoomPhase::Lobby,
            config,
            players: BTreeMap::new(),
            tick: 0,
            events,
            signals,
            pending_signals: Some(pending),
            summary: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the lobby roster is non-empty and every player is ready.
    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|player| player.ready)
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
/// Handlers, socket tasks, and loop tasks all operate on the same
/// registry.
#[derive(Debug)]
pub struct AppState {
    /// Registered rooms keyed by id.
    pub rooms: RwLock<BTreeMap<RoomId, RoomHandle>>,
    /// Engine configuration applied to new rooms, before per-room
    /// overrides.
    pub defaults: EngineConfig,
}

impl AppState {
    /// Create an application state with an empty registry.
    pub fn new(defaults: EngineConfig) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            defaults,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Seat the roster and spawn the loop task for a lobby room.
///
/// Adds the configured autonomous players, generates the map, replaces
/// the lobby roster with the seated players, and moves the room to
/// [`RoomPhase::Running`]. The caller holds the registry write lock and
/// has already verified the roster is ready.
///
/// # Errors
///
/// Returns [`RoomError`] when map generation or seating fails; the
/// room stays in the lobby and can be launched again.
pub(crate) fn launch_room(
    state: &Arc<AppState>,
    handle: &mut RoomHandle,
) -> Result<(), RoomError> {
    let Some(signals) = handle.pending_signals.take() else {
        // A concurrent ready call already launched the loop.
        return Ok(());
    };

    let humans: Vec<Player> = handle.players.values().cloned().collect();
    let room = match room::setup_room(handle.config.clone(), humans) {
        Ok(room) => room,
        Err(e) => {
            handle.pending_signals = Some(signals);
            return Err(e);
        }
    };

    handle.phase = RoomPhase::Running;
    handle.players = room
        .store
        .players()
        .map(|player| (player.id, player.clone()))
        .collect();
    info!(
        room = %handle.id,
        players = handle.players.len(),
        "Room launched"
    );

    tokio::spawn(drive_room(
        Arc::clone(state),
        handle.id,
        room,
        signals,
        handle.events.clone(),
    ));
    Ok(())
}

/// Drive one room's loop to completion, then record the outcome.
async fn drive_room(
    state: Arc<AppState>,
    room_id: RoomId,
    mut room: RoomState,
    mut signals: mpsc::Receiver<RoomSignal>,
    events: broadcast::Sender<RoomEvent>,
) {
    let mut observer = RegistryObserver::new(Arc::clone(&state), room_id);
    let result = runner::run_room(&mut room, &mut signals, &events, &mut observer).await;

    let summary = match result {
        Ok(outcome) => {
            info!(
                room = %room_id,
                reason = ?outcome.end_reason,
                winner = ?outcome.winner,
                final_tick = outcome.final_tick,
                "Room finished"
            );
            MatchSummary {
                winner_id: outcome.winner,
                final_tick: outcome.final_tick,
                reason: outcome.end_reason,
                timestamp: Utc::now(),
            }
        }
        Err(e) => {
            error!(room = %room_id, error = %e, "Room loop failed");
            // A failed loop still closes the room for its subscribers.
            let summary = MatchSummary {
                winner_id: None,
                final_tick: room.clock.tick(),
                reason: EndReason::Stopped,
                timestamp: Utc::now(),
            };
            let _ = events.send(RoomEvent::MatchEnded(summary.clone()));
            summary
        }
    };

    let mut rooms = state.rooms.write().await;
    if let Some(handle) = rooms.get_mut(&room_id) {
        handle.phase = RoomPhase::Finished;
        handle.tick = room.clock.tick();
        handle.players = room
            .store
            .players()
            .map(|player| (player.id, player.clone()))
            .collect();
        handle.summary = Some(summary);
    }
}

/// Tick observer that mirrors loop progress into the registry.
pub struct RegistryObserver {
    state: Arc<AppState>,
    room_id: RoomId,
}

impl RegistryObserver {
    /// Create an observer that updates the given room's handle.
    pub const fn new(state: Arc<AppState>, room_id: RoomId) -> Self {
        Self { state, room_id }
    }
}

impl TickObserver for RegistryObserver {
    fn on_tick(&mut self, summary: &TickSummary, store: &StateStore) {
        // try_write: a REST read in flight must not stall the tick.
        if let Ok(mut rooms) = self.state.rooms.try_write()
            && let Some(handle) = rooms.get_mut(&self.room_id)
        {
            handle.tick = summary.tick;
            handle.players = store
                .players()
                .map(|player| (player.id, player.clone()))
                .collect();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use starhold_types::PlayerKind;

    use super::*;

    fn make_human(name: &str, ready: bool) -> Player {
        Player {
            id: PlayerId::new(),
            name: name.to_owned(),
            color: "#e6194b".to_owned(),
            kind: PlayerKind::Human,
            territories: std::collections::BTreeSet::new(),
            eliminated: false,
            ready,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn new_handle_starts_in_the_lobby() {
        let handle = RoomHandle::new("Frontier".to_owned(), EngineConfig::default());
        assert_eq!(handle.phase, RoomPhase::Lobby);
        assert_eq!(handle.tick, 0);
        assert!(handle.players.is_empty());
        assert!(handle.summary.is_none());
        assert!(handle.pending_signals.is_some());
    }

    #[test]
    fn empty_roster_is_never_ready() {
        let handle = RoomHandle::new("Frontier".to_owned(), EngineConfig::default());
        assert!(!handle.all_ready());
    }

    #[test]
    fn all_ready_requires_every_player() {
        let mut handle = RoomHandle::new("Frontier".to_owned(), EngineConfig::default());
        let ready = make_human("A", true);
        let waiting = make_human("B", false);
        let waiting_id = waiting.id;
        handle.players.insert(ready.id, ready);
        handle.players.insert(waiting_id, waiting);
        assert!(!handle.all_ready());

        if let Some(player) = handle.players.get_mut(&waiting_id) {
            player.ready = true;
        }
        assert!(handle.all_ready());
    }

    #[tokio::test]
    async fn launch_seats_bots_and_moves_the_room_to_running() {
        let mut config = EngineConfig::default();
        config.map.seed = 11;
        config.map.territory_count = 16;
        config.ai.autonomous_players = 2;
        config.simulation.tick_interval_ms = 50;

        let state = Arc::new(AppState::new(config.clone()));
        let mut handle = RoomHandle::new("Frontier".to_owned(), config);
        let human = make_human("A", true);
        handle.players.insert(human.id, human);

        launch_room(&state, &mut handle).unwrap();

        assert_eq!(handle.phase, RoomPhase::Running);
        // One human plus two autonomous players.
        assert_eq!(handle.players.len(), 3);
        assert!(handle.pending_signals.is_none());

        // A second launch attempt is a no-op, not a second loop.
        launch_room(&state, &mut handle).unwrap();
        assert_eq!(handle.players.len(), 3);
    }

    #[tokio::test]
    async fn failed_launch_leaves_the_room_launchable() {
        let mut config = EngineConfig::default();
        config.map.seed = 3;
        // More seats than territories: map generation must refuse.
        config.map.territory_count = 2;
        config.ai.autonomous_players = 5;

        let state = Arc::new(AppState::new(config.clone()));
        let mut handle = RoomHandle::new("Cramped".to_owned(), config);
        let human = make_human("A", true);
        handle.players.insert(human.id, human);

        assert!(launch_room(&state, &mut handle).is_err());
        assert_eq!(handle.phase, RoomPhase::Lobby);
        assert!(handle.pending_signals.is_some());
    }
}
