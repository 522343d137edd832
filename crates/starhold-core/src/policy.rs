//! Decision policy for autonomous players.
//!
//! Evaluated on a per-player schedule, the policy proposes at most one
//! command per evaluation. Proposals go through the same validation
//! pipeline as human commands; a rejection is dropped silently rather
//! than broadcast.
//!
//! The posture depends on map share. Below the expansion share target
//! the player prefers colonizing neutral territory and falls back to
//! attacking; at or above it the preference flips. Both moves scan
//! owned territories in ascending id order, so a fixed state always
//! yields the same proposal.

use starhold_types::{Command, CommandKind, PlayerId, TerritoryId};

use crate::config::AiSettings;
use crate::store::StateStore;

/// Propose the next command for an autonomous player, if any move is
/// worth making.
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
#[must_use]
pub fn decide(
    store: &StateStore,
    settings: &AiSettings,
    probe_cost: u32,
    garrison_floor: u32,
    player: PlayerId,
) -> Option<Command> {
    let snapshot = store.player(player).ok()?;
    if snapshot.eliminated {
        return None;
    }
    let owned: Vec<TerritoryId> = snapshot.territories.iter().copied().collect();
    let total = store.map().territory_count();
    if owned.is_empty() || total == 0 {
        return None;
    }

    let share = owned.len() as f64 / total as f64;
    if share < settings.expansion_share_target {
        expansion_move(store, &owned, probe_cost, player)
            .or_else(|| aggression_move(store, &owned, settings, garrison_floor, player))
    } else {
        aggression_move(store, &owned, settings, garrison_floor, player)
            .or_else(|| expansion_move(store, &owned, probe_cost, player))
    }
}

/// First affordable probe launch at an uncontested colonizable neighbor.
///
/// Targets another player is already probing are skipped; the later
/// probe would dissolve on arrival and the armies would be wasted.
fn expansion_move(
    store: &StateStore,
    owned: &[TerritoryId],
    probe_cost: u32,
    player: PlayerId,
) -> Option<Command> {
    for &from in owned {
        let Ok(source) = store.territory(from) else {
            continue;
        };
        if source.army_size <= probe_cost {
            continue;
        }
        let target = store.map().neighbors(from).iter().copied().find(|&n| {
            let open = store
                .territory(n)
                .is_ok_and(|t| t.owner.is_none() && t.colonizable);
            open && !store.probes().any(|p| p.destination == n && p.owner == player)
        });
        if let Some(to) = target {
            return Some(Command::new(CommandKind::LaunchProbe, from, to));
        }
    }
    None
}

/// First attack where the source overpowers an enemy neighbor.
///
/// The source must clear the aggression multiplier against the target
/// and have something to commit beyond its garrison floor. Among
/// qualifying neighbors the weakest is attacked; ties fall to the
/// lowest territory id.
#[allow(clippy::arithmetic_side_effects)]
fn aggression_move(
    store: &StateStore,
    owned: &[TerritoryId],
    settings: &AiSettings,
    garrison_floor: u32,
    player: PlayerId,
) -> Option<Command> {
    for &from in owned {
        let Ok(source) = store.territory(from) else {
            continue;
        };
        if source.army_size <= garrison_floor {
            continue;
        }

        let mut target: Option<(u32, TerritoryId)> = None;
        for &n in store.map().neighbors(from) {
            let Ok(candidate) = store.territory(n) else {
                continue;
            };
            let Some(owner) = candidate.owner else {
                continue;
            };
            if owner == player {
                continue;
            }
            let overpowered = f64::from(source.army_size)
                > f64::from(candidate.army_size) * settings.aggression_multiplier;
            if !overpowered {
                continue;
            }
            let better = target.is_none_or(|(army, id)| {
                candidate.army_size < army || (candidate.army_size == army && n < id)
            });
            if better {
                target = Some((candidate.army_size, n));
            }
        }

        if let Some((_, to)) = target {
            return Some(Command::new(CommandKind::AttackTerritory, from, to));
        }
    }
    None
}
