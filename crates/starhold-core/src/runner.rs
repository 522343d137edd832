//! Async room loop runner.
//!
//! This module provides [`run_room`], the top-level async function that
//! drives one room's tick loop:
//!
//! - **Signal drain**: commands, disconnects, snapshot requests, and
//!   stop requests arrive over one mpsc channel and are absorbed at the
//!   tick boundary, never mid-tick.
//! - **Event fan-out**: a full snapshot at loop start, immediate combat
//!   and rejection events, and dirty-set deltas at the broadcast
//!   cadence, all through a `tokio::sync::broadcast` sender.
//! - **Bounded run**: the loop exits on last-player-standing, on the
//!   configured tick limit, or on an external stop.
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it.
//!
//! [`run_tick`]: crate::tick::run_tick

use chrono::Utc;
use starhold_types::{
    EndReason, FullSnapshot, MatchSummary, PlayerId, QueuedCommand, RoomEvent,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::room;
use crate::store::StateStore;
use crate::sync;
use crate::tick::{self, RoomState, TickError, TickSummary};

/// Errors that can occur while driving a room.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Control and input signals delivered to a running room.
#[derive(Debug)]
pub enum RoomSignal {
    /// A player command to apply at the next tick.
    Command(QueuedCommand),
    /// A human player's transport connection closed.
    Disconnect(PlayerId),
    /// Request a point-in-time full snapshot (subscriber attach).
    Snapshot(oneshot::Sender<FullSnapshot>),
    /// Stop the loop at the next tick boundary.
    Stop,
}

/// How a finished room concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Why the loop exited.
    pub end_reason: EndReason,
    /// The winning player, when one exists.
    pub winner: Option<PlayerId>,
    /// Tick at which the loop exited.
    pub final_tick: u64,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to mirror tick counters into shared
/// registry state, export metrics, etc. The callback runs on the loop
/// task between a tick's mutations and its delta broadcast, so it must
/// not block.
pub trait TickObserver: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, store: &StateStore);
}

/// A no-op tick observer for tests and headless rooms.
pub struct NoOpObserver;

impl TickObserver for NoOpObserver {
    fn on_tick(&mut self, _summary: &TickSummary, _store: &StateStore) {}
}

/// Drive a room's tick loop until the match ends.
///
/// Sends one [`RoomEvent::FullState`] when the loop starts, then per
/// tick: drains signals, runs the tick, forwards immediate events,
/// invokes the observer, and broadcasts a delta at the configured
/// cadence. Dirty sets are cleared only after a delta send reaches at
/// least one subscriber; a failed send leaves them intact for the next
/// pass. A closed signal channel stops the room.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_room(
    state: &mut RoomState,
    signals: &mut mpsc::Receiver<RoomSignal>,
    events: &broadcast::Sender<RoomEvent>,
    callback: &mut dyn TickObserver,
) -> Result<MatchOutcome, RunnerError> {
    info!(
        tick_interval_ms = state.config.simulation.tick_interval_ms,
        max_ticks = state.config.simulation.max_ticks,
        broadcast_every_n_ticks = state.config.simulation.broadcast_every_n_ticks,
        "Room loop starting"
    );

    // Late subscribers get their own snapshot on attach; this one seeds
    // the clients already connected at start.
    let _ = events.send(RoomEvent::FullState(sync::full_snapshot(
        &state.store,
        state.clock.tick(),
    )));

    let mut inbound: Vec<QueuedCommand> = Vec::new();
    loop {
        // --- Drain control signals and queued commands ---
        inbound.clear();
        loop {
            match signals.try_recv() {
                Ok(RoomSignal::Command(queued)) => inbound.push(queued),
                Ok(RoomSignal::Disconnect(player)) => {
                    if let Err(error) = room::handle_disconnect(&mut state.store, player) {
                        debug!(player = %player, %error, "Disconnect for unknown player ignored");
                    }
                }
                Ok(RoomSignal::Snapshot(reply)) => {
                    let snapshot = sync::full_snapshot(&state.store, state.clock.tick());
                    let _ = reply.send(snapshot);
                }
                Ok(RoomSignal::Stop) => {
                    info!(tick = state.clock.tick(), "Room stop requested");
                    return Ok(finish(state, events, EndReason::Stopped, None));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!(
                        tick = state.clock.tick(),
                        "All signal senders dropped; stopping room"
                    );
                    return Ok(finish(state, events, EndReason::Stopped, None));
                }
            }
        }

        // --- Execute one tick ---
        let output = tick::run_tick(state, &inbound)?;

        // --- Immediate events (combat results, private rejections) ---
        for event in output.events {
            let _ = events.send(event);
        }

        callback.on_tick(&output.summary, &state.store);

        // --- Delta broadcast at the configured cadence ---
        if state
            .clock
            .is_due(state.config.simulation.broadcast_every_n_ticks)
        {
            if let Some(delta) = sync::build_delta(&state.store, output.summary.tick) {
                // Dirty sets survive a failed send for the next pass.
                if events.send(RoomEvent::DeltaState(delta)).is_ok() {
                    state.store.clear_dirty();
                }
            }
        }

        // --- Match end ---
        if let Some(summary) = room::match_status(state) {
            info!(
                tick = summary.final_tick,
                reason = ?summary.reason,
                winner = ?summary.winner_id,
                "Match ended"
            );
            let outcome = MatchOutcome {
                end_reason: summary.reason,
                winner: summary.winner_id,
                final_tick: summary.final_tick,
            };
            let _ = events.send(RoomEvent::MatchEnded(summary));
            return Ok(outcome);
        }

        // --- Sleep for the tick interval ---
        let interval_ms = state.config.simulation.tick_interval_ms;
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Broadcast a match summary for an externally-stopped room and build
/// the outcome.
fn finish(
    state: &RoomState,
    events: &broadcast::Sender<RoomEvent>,
    reason: EndReason,
    winner: Option<PlayerId>,
) -> MatchOutcome {
    let final_tick = state.clock.tick();
    let _ = events.send(RoomEvent::MatchEnded(MatchSummary {
        winner_id: winner,
        final_tick,
        reason,
        timestamp: Utc::now(),
    }));
    MatchOutcome {
        end_reason: reason,
        winner,
        final_tick,
    }
}
