//! Room lifecycle: match setup, capital consequences, elimination, and
//! end-of-match detection.
//!
//! Setup generates the map, seats humans and autonomous players on
//! maximally-separated starts, and staggers the bot decision schedule.
//! After setup the tick loop owns the [`RoomState`]; this module is
//! called back for the events that change who is still playing.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use starhold_galaxy::{GalaxyError, build_map};
use starhold_types::{
    EndReason, MatchSummary, Player, PlayerId, PlayerKind, ProbeId, TerritoryId,
};
use tracing::{debug, info};

use crate::clock::RoomClock;
use crate::command::{CapitalCapture, CommandProcessor};
use crate::config::{CapitalMechanic, EngineConfig};
use crate::store::{StateStore, StoreError};
use crate::supply;
use crate::tick::RoomState;

/// Display palette assigned to players in join order.
pub const PLAYER_COLORS: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c",
    "#fabebe", "#008080",
];

/// Names given to autonomous players, in slot order.
const BOT_NAMES: &[&str] = &[
    "Meridian Combine",
    "Ashfall Compact",
    "Halcyon Directorate",
    "Outer Veil Syndicate",
    "Cinder Pact",
    "Aurora Tithe",
];

/// Errors that can occur while setting up or ending a room.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Map generation failed.
    #[error("map generation failed: {0}")]
    Galaxy(#[from] GalaxyError),

    /// The state store rejected a setup mutation.
    #[error("state store error: {0}")]
    Store(#[from] StoreError),
}

/// Where an eliminated player's holdings go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Holdings revert to neutral.
    Neutralize,
    /// Holdings transfer to the given player.
    TransferTo(PlayerId),
}

/// Palette color for the given join position.
#[must_use]
pub fn player_color(position: usize) -> String {
    PLAYER_COLORS
        .iter()
        .cycle()
        .nth(position)
        .copied()
        .unwrap_or("#808080")
        .to_owned()
}

/// Display name for the autonomous player in the given slot.
fn bot_name(slot: u32) -> String {
    usize::try_from(slot)
        .ok()
        .and_then(|index| BOT_NAMES.get(index))
        .map_or_else(
            || format!("Autonomous {}", slot.saturating_add(1)),
            |name| (*name).to_owned(),
        )
}

/// Build a ready-to-run room from a config and its human roster.
///
/// Adds the configured number of autonomous players, generates the map
/// with one start per seat, assigns ownership, and staggers the first
/// bot decision across the decision interval. A zero map seed draws the
/// RNG from OS entropy; any other value reproduces the room exactly.
///
/// # Errors
///
/// Returns [`RoomError::Galaxy`] when map generation fails (for
/// example, more seats than territories) and [`RoomError::Store`] when
/// a setup mutation is refused.
pub fn setup_room(config: EngineConfig, humans: Vec<Player>) -> Result<RoomState, RoomError> {
    let mut rng = if config.map.seed == 0 {
        SmallRng::from_os_rng()
    } else {
        SmallRng::seed_from_u64(config.map.seed)
    };

    let mut players = humans;
    let human_count = players.len();
    for slot in 0..config.ai.autonomous_players {
        let position =
            human_count.saturating_add(usize::try_from(slot).unwrap_or(usize::MAX));
        players.push(Player {
            id: PlayerId::new(),
            name: bot_name(slot),
            color: player_color(position),
            kind: PlayerKind::Autonomous,
            territories: std::collections::BTreeSet::new(),
            eliminated: false,
            ready: true,
            joined_at: Utc::now(),
        });
    }

    let built = build_map(&config.map_layout(), players.len(), &mut rng)?;
    let mut store = StateStore::new(built.map);

    let seats: Vec<(PlayerId, PlayerKind)> =
        players.iter().map(|player| (player.id, player.kind)).collect();
    for player in players {
        store.add_player(player)?;
    }
    for (&(id, _), &start) in seats.iter().zip(&built.starting_territories) {
        store.set_owner(start, Some(id))?;
    }

    let mut schedule = BTreeMap::new();
    for &(id, kind) in &seats {
        if kind == PlayerKind::Autonomous {
            let first = rng.random_range(1..=config.ai.decision_interval_ticks.max(1));
            schedule.insert(id, first);
        }
    }

    // Setup state rides the initial full snapshot, not the first delta.
    store.clear_dirty();

    info!(
        players = seats.len(),
        bots = schedule.len(),
        territories = store.map().territory_count(),
        seed = config.map.seed,
        "Room initialized"
    );

    Ok(RoomState {
        clock: RoomClock::new(),
        store,
        config,
        rng,
        processor: CommandProcessor::new(),
        schedule,
    })
}

/// Apply the configured consequence after a capital fell.
///
/// The capital flag itself was already cleared by the capture; this
/// decides what the loss means for the previous owner.
///
/// # Errors
///
/// Propagates store errors from the elimination sweep.
pub fn apply_capital_capture(
    store: &mut StateStore,
    config: &EngineConfig,
    capture: &CapitalCapture,
) -> Result<(), StoreError> {
    match config.map.capital_mechanic {
        CapitalMechanic::Off => Ok(()),
        CapitalMechanic::Eliminate => {
            info!(
                player = %capture.previous_owner,
                captor = %capture.captor,
                territory = %capture.territory,
                "Capital fell; holdings turn neutral"
            );
            eliminate_player(store, capture.previous_owner, Disposal::Neutralize)
        }
        CapitalMechanic::Cascade => {
            info!(
                player = %capture.previous_owner,
                captor = %capture.captor,
                territory = %capture.territory,
                "Capital fell; holdings cascade to the captor"
            );
            eliminate_player(
                store,
                capture.previous_owner,
                Disposal::TransferTo(capture.captor),
            )
        }
    }
}

/// Remove a player from the match.
///
/// Disposes of every held territory, destroys the player's in-flight
/// probes, tears down their supply routes, and marks them eliminated.
/// Capital flags do not survive disposal, so a cascade never hands the
/// captor a second capital.
///
/// # Errors
///
/// Returns [`StoreError::PlayerNotFound`] for an unknown player and
/// propagates any store refusal mid-sweep.
pub fn eliminate_player(
    store: &mut StateStore,
    player: PlayerId,
    disposal: Disposal,
) -> Result<(), StoreError> {
    let holdings: Vec<TerritoryId> = store.player(player)?.territories.iter().copied().collect();
    let new_owner = match disposal {
        Disposal::Neutralize => None,
        Disposal::TransferTo(captor) => Some(captor),
    };
    for territory in holdings {
        store.clear_capital(territory)?;
        store.set_owner(territory, new_owner)?;
    }

    let probes: Vec<ProbeId> = store
        .probes()
        .filter(|probe| probe.owner == player)
        .map(|probe| probe.id)
        .collect();
    for id in probes {
        store.remove_probe(id)?;
    }

    supply::teardown_for_player(store, player);
    store.mark_eliminated(player)?;
    debug!(player = %player, ?disposal, "Player eliminated");
    Ok(())
}

/// Remove a disconnected human from the match.
///
/// Holdings always revert to neutral on disconnect, regardless of the
/// capital mechanic. A player who was already eliminated disconnects
/// without further state changes.
///
/// # Errors
///
/// Returns [`StoreError::PlayerNotFound`] for an unknown player.
pub fn handle_disconnect(store: &mut StateStore, player: PlayerId) -> Result<(), StoreError> {
    if store.player(player)?.eliminated {
        return Ok(());
    }
    info!(player = %player, "Player disconnected; holdings turn neutral");
    eliminate_player(store, player, Disposal::Neutralize)
}

/// Whether the match has ended, and how.
///
/// Returns `None` while the match is still running. A match ends when
/// at most one player remains active, or when the configured tick limit
/// is reached, in which case the active player holding the most
/// territories wins (ties keep the first player in id order).
#[must_use]
pub fn match_status(state: &RoomState) -> Option<MatchSummary> {
    let tick = state.clock.tick();
    let active: Vec<&Player> = state.store.active_players().collect();
    if active.len() <= 1 {
        return Some(MatchSummary {
            winner_id: active.first().map(|player| player.id),
            final_tick: tick,
            reason: EndReason::LastPlayerStanding,
            timestamp: Utc::now(),
        });
    }

    let max_ticks = state.config.simulation.max_ticks;
    if max_ticks > 0 && tick >= max_ticks {
        // Strictly-greater keeps the first-iterated player on ties.
        let mut leader: Option<(usize, PlayerId)> = None;
        for player in active {
            let held = player.territories.len();
            if leader.is_none_or(|(best, _)| held > best) {
                leader = Some((held, player.id));
            }
        }
        return Some(MatchSummary {
            winner_id: leader.map(|(_, id)| id),
            final_tick: tick,
            reason: EndReason::MaxTicksReached,
            timestamp: Utc::now(),
        });
    }
    None
}
