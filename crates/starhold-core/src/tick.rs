//! The per-room tick cycle.
//!
//! One tick runs to completion before the next begins: queued commands
//! drain in arrival order (combat resolves inline), autonomous players
//! act, probes fly, armies grow, supply routes drain, and the periodic
//! reconciliation sweep runs. The loop owns its [`RoomState`]
//! exclusively, so no phase ever contends with another.
//!
//! Command failures never abort a tick. Client-visible rejections
//! become private notices; internal store refusals trigger a
//! reconciliation pass and the command is dropped.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rand::rngs::SmallRng;
use starhold_types::{
    PlayerId, ProbeId, QueuedCommand, RejectionNotice, RoomEvent, TerritoryId,
};
use tracing::{debug, warn};

use crate::clock::{ClockError, RoomClock};
use crate::command::{CommandFailure, CommandProcessor, ExecuteOutcome};
use crate::config::EngineConfig;
use crate::policy;
use crate::room;
use crate::store::{StateStore, StoreError};
use crate::supply;

/// Errors that abort a tick.
///
/// Only clock exhaustion and store-level corruption outside the
/// command path land here; per-command failures are absorbed inside
/// the tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The room clock could not advance.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// A simulation phase hit an unrecoverable store inconsistency.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Counters describing what one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick these counters describe.
    pub tick: u64,
    /// Commands applied successfully (human and autonomous).
    pub commands_applied: u32,
    /// Commands rejected.
    pub commands_rejected: u32,
    /// Attacks resolved.
    pub battles: u32,
    /// Probes that completed their flight this tick.
    pub probes_resolved: u32,
    /// Players still in the match after this tick.
    pub players_active: u32,
    /// Whether the reconciliation sweep repaired anything.
    pub drift_repaired: bool,
}

/// Everything a room's tick loop owns.
#[derive(Debug)]
pub struct RoomState {
    /// Monotonic tick counter.
    pub clock: RoomClock,
    /// The authoritative game state.
    pub store: StateStore,
    /// Engine configuration the room was started with.
    pub config: EngineConfig,
    /// Per-room RNG; seeded from config (0 = OS entropy).
    pub rng: SmallRng,
    /// Command validation pipeline.
    pub processor: CommandProcessor,
    /// Next decision tick per autonomous player.
    pub schedule: BTreeMap<PlayerId, u64>,
}

/// What one tick produced for the outside world.
#[derive(Debug)]
pub struct TickOutput {
    /// Counters for observers and logs.
    pub summary: TickSummary,
    /// Events to broadcast, in emission order.
    pub events: Vec<RoomEvent>,
}

/// Advance the room by exactly one tick.
///
/// # Errors
///
/// Returns [`TickError`] when the clock overflows or a non-command
/// phase hits store corruption. Command-level failures are absorbed.
pub fn run_tick(state: &mut RoomState, inbound: &[QueuedCommand]) -> Result<TickOutput, TickError> {
    let tick = state.clock.advance()?;
    state.processor.begin_tick();
    let mut summary = TickSummary {
        tick,
        ..TickSummary::default()
    };
    let mut events = Vec::new();

    // --- Phase 1: drain queued commands in arrival order ---
    phase_commands(state, tick, inbound, &mut summary, &mut events)?;

    // --- Phase 2: autonomous decisions ---
    phase_autonomous(state, tick, &mut summary, &mut events)?;

    // --- Phase 3: probe flights and army growth ---
    phase_probes(state, tick, &mut summary)?;
    if state.clock.is_due(state.config.simulation.growth_interval_ticks) {
        phase_growth(state)?;
    }

    // --- Phase 4: supply routes ---
    supply::advance_shipments(&mut state.store, &state.config.supply, tick)?;
    if state.clock.is_due(state.config.supply.transfer_interval_ticks) {
        supply::run_transfers(&mut state.store, &state.config.supply, tick)?;
    }
    if state.clock.is_due(state.config.supply.revalidate_interval_ticks) {
        supply::revalidate_routes(&mut state.store, tick)?;
    }

    // --- Phase 5: periodic reconciliation sweep ---
    if state
        .clock
        .is_due(state.config.simulation.reconcile_interval_ticks)
    {
        let report = state.store.reconcile();
        summary.drift_repaired = !report.is_clean();
        if summary.drift_repaired {
            warn!(tick, ?report, "Reconciliation repaired state drift");
        }
    }

    summary.players_active =
        u32::try_from(state.store.active_players().count()).unwrap_or(u32::MAX);
    debug!(
        tick,
        applied = summary.commands_applied,
        rejected = summary.commands_rejected,
        battles = summary.battles,
        "Tick complete"
    );
    Ok(TickOutput { summary, events })
}

/// Apply every queued human command against the live store.
fn phase_commands(
    state: &mut RoomState,
    tick: u64,
    inbound: &[QueuedCommand],
    summary: &mut TickSummary,
    events: &mut Vec<RoomEvent>,
) -> Result<(), TickError> {
    for queued in inbound {
        let result = state.processor.execute(
            &mut state.store,
            &state.config,
            tick,
            &mut state.rng,
            queued.player_id,
            &queued.command,
        );
        match result {
            Ok(outcome) => {
                summary.commands_applied = summary.commands_applied.saturating_add(1);
                absorb_outcome(state, outcome, summary, events)?;
            }
            Err(CommandFailure::Rejected(rejection)) => {
                summary.commands_rejected = summary.commands_rejected.saturating_add(1);
                debug!(
                    player = %queued.player_id,
                    command = %queued.command.kind,
                    reason = %rejection,
                    "Command rejected"
                );
                events.push(RoomEvent::CommandRejected(RejectionNotice {
                    player_id: queued.player_id,
                    command: queued.command.kind,
                    reason: rejection.to_string(),
                    class: rejection.class(),
                    timestamp: Utc::now(),
                }));
            }
            Err(CommandFailure::Internal(error)) => {
                warn!(
                    player = %queued.player_id,
                    %error,
                    "Store refused a validated command; reconciling"
                );
                let report = state.store.reconcile();
                summary.drift_repaired = summary.drift_repaired || !report.is_clean();
            }
        }
    }
    Ok(())
}

/// Evaluate the decision policy for every autonomous player whose
/// schedule came due, then reschedule with jitter.
///
/// Policy proposals run through the same pipeline as human commands,
/// but their rejections are dropped silently instead of broadcast.
fn phase_autonomous(
    state: &mut RoomState,
    tick: u64,
    summary: &mut TickSummary,
    events: &mut Vec<RoomEvent>,
) -> Result<(), TickError> {
    let due: Vec<PlayerId> = state
        .schedule
        .iter()
        .filter(|&(_, &next)| next <= tick)
        .map(|(id, _)| *id)
        .collect();

    for player in due {
        let proposed = policy::decide(
            &state.store,
            &state.config.ai,
            state.config.probes.cost,
            state.config.combat.garrison_floor,
            player,
        );
        if let Some(command) = proposed {
            let result = state.processor.execute(
                &mut state.store,
                &state.config,
                tick,
                &mut state.rng,
                player,
                &command,
            );
            match result {
                Ok(outcome) => {
                    summary.commands_applied = summary.commands_applied.saturating_add(1);
                    absorb_outcome(state, outcome, summary, events)?;
                }
                Err(CommandFailure::Rejected(rejection)) => {
                    debug!(player = %player, reason = %rejection, "Autonomous command rejected");
                }
                Err(CommandFailure::Internal(error)) => {
                    warn!(player = %player, %error, "Store refused an autonomous command; reconciling");
                    let report = state.store.reconcile();
                    summary.drift_repaired = summary.drift_repaired || !report.is_clean();
                }
            }
        }

        let jitter = state
            .rng
            .random_range(0..=state.config.ai.decision_jitter_ticks);
        let next = tick
            .saturating_add(state.config.ai.decision_interval_ticks)
            .saturating_add(jitter);
        state.schedule.insert(player, next);
    }
    Ok(())
}

/// Advance probe progress and resolve completed flights.
///
/// A landing probe colonizes its destination only if it is still
/// neutral and colonizable; otherwise the probe dissolves without
/// mutating the territory.
fn phase_probes(
    state: &mut RoomState,
    tick: u64,
    summary: &mut TickSummary,
) -> Result<(), StoreError> {
    let in_flight: Vec<(ProbeId, u64, u64)> = state
        .store
        .probes()
        .map(|probe| (probe.id, probe.launch_tick, probe.duration_ticks))
        .collect();

    for (id, launch_tick, duration_ticks) in in_flight {
        let elapsed = tick.saturating_sub(launch_tick);
        if elapsed >= duration_ticks {
            let probe = state.store.remove_probe(id)?;
            summary.probes_resolved = summary.probes_resolved.saturating_add(1);
            let target = state.store.territory(probe.destination)?;
            if target.owner.is_none() && target.colonizable {
                state
                    .store
                    .set_owner(probe.destination, Some(probe.owner))?;
                state.store.set_army(probe.destination, probe.armies)?;
                debug!(tick, destination = %probe.destination, owner = %probe.owner, "Probe colonized its destination");
            } else {
                debug!(tick, destination = %probe.destination, "Probe dissolved: destination taken");
            }
        } else {
            let probe = state.store.probe_mut(id)?;
            probe.progress = progress_fraction(elapsed, duration_ticks);
        }
    }
    Ok(())
}

/// Grant periodic army growth to every owned territory.
fn phase_growth(state: &mut RoomState) -> Result<(), StoreError> {
    let owned: Vec<(TerritoryId, bool)> = state
        .store
        .map()
        .territories()
        .filter(|(_, territory)| territory.owner.is_some())
        .map(|(id, territory)| (*id, territory.capital))
        .collect();

    let base = state.config.simulation.growth_amount;
    let bonus = state.config.simulation.capital_growth_bonus;
    for (id, capital) in owned {
        let amount = if capital {
            base.saturating_add(bonus)
        } else {
            base
        };
        state.store.add_army(id, amount)?;
    }
    Ok(())
}

/// Push a command's side effects into the tick output.
fn absorb_outcome(
    state: &mut RoomState,
    outcome: ExecuteOutcome,
    summary: &mut TickSummary,
    events: &mut Vec<RoomEvent>,
) -> Result<(), TickError> {
    if let Some(broadcast) = outcome.combat {
        summary.battles = summary.battles.saturating_add(1);
        events.push(RoomEvent::CombatResult(broadcast));
    }
    if let Some(capture) = outcome.capital_captured {
        room::apply_capital_capture(&mut state.store, &state.config, &capture)?;
    }
    Ok(())
}

/// Elapsed flight time as a fraction of total duration.
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
fn progress_fraction(elapsed: u64, duration: u64) -> f64 {
    if duration == 0 {
        return 1.0;
    }
    ((elapsed as f64) / (duration as f64)).clamp(0.0, 1.0)
}
