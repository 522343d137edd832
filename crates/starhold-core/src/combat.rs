//! Stochastic combat resolution.
//!
//! Resolution is a pure function over the committed and defending army
//! counts plus an injected RNG; applying the outcome to the store is a
//! separate step. Callers validate preconditions (ownership, adjacency,
//! the garrison floor) before resolving, so application cannot
//! half-apply.
//!
//! Power rolls: `attack = committed * random(attack multipliers)`,
//! `defense = defenders * random(defense multipliers)`; the attacker
//! takes the territory iff attack power strictly exceeds defense power.
//! The winning side keeps `ceil(count * survival_rate)` armies.

use rand::Rng;
use starhold_types::{Casualties, CombatOutcome, PlayerId, TerritoryId};

use crate::config::CombatSettings;
use crate::store::{StateStore, StoreError};

/// Everything a resolved attack changes, before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCombat {
    /// Who holds the territory after the fight.
    pub outcome: CombatOutcome,
    /// Armies the winning side keeps.
    pub survivors: u32,
    /// Losses on both sides.
    pub casualties: Casualties,
}

/// Resolve one attack of `committed` armies against `defenders`.
///
/// Pure aside from the injected RNG: a fixed seed and fixed inputs
/// always produce the same result.
#[allow(clippy::arithmetic_side_effects)]
pub fn resolve_attack(
    committed: u32,
    defenders: u32,
    settings: &CombatSettings,
    rng: &mut impl Rng,
) -> ResolvedCombat {
    let attack_power = f64::from(committed)
        * rng.random_range(settings.attack_multiplier_min..=settings.attack_multiplier_max);
    let defense_power = f64::from(defenders)
        * rng.random_range(settings.defense_multiplier_min..=settings.defense_multiplier_max);

    if attack_power > defense_power {
        let survivors = ceil_fraction(committed, settings.attacker_survival_rate);
        ResolvedCombat {
            outcome: CombatOutcome::AttackerWon,
            survivors,
            casualties: Casualties {
                attacker: committed.saturating_sub(survivors),
                defender: defenders,
            },
        }
    } else {
        let survivors = ceil_fraction(defenders, settings.defender_survival_rate);
        ResolvedCombat {
            outcome: CombatOutcome::DefenderHeld,
            survivors,
            casualties: Casualties {
                attacker: committed,
                defender: defenders.saturating_sub(survivors),
            },
        }
    }
}

/// Apply a resolved attack to the store as one mutation.
///
/// On an attacker victory the target changes owner and holds the
/// surviving attackers; on a defender hold the target keeps its owner
/// with the surviving defenders. Either way the source drops to the
/// garrison floor. The target is mutated first so a broken reference
/// leaves the source untouched.
///
/// # Errors
///
/// Propagates [`StoreError`] if a referenced entity vanished between
/// validation and application.
pub fn apply_attack(
    store: &mut StateStore,
    from: TerritoryId,
    to: TerritoryId,
    attacker: PlayerId,
    resolved: &ResolvedCombat,
    garrison_floor: u32,
) -> Result<(), StoreError> {
    match resolved.outcome {
        CombatOutcome::AttackerWon => {
            store.transfer_territory(to, attacker, resolved.survivors)?;
        }
        CombatOutcome::DefenderHeld => {
            store.set_army(to, resolved.survivors)?;
        }
    }
    store.set_army(from, garrison_floor)
}

/// `ceil(count * rate)`, clamped into `u32`.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ceil_fraction(count: u32, rate: f64) -> u32 {
    let raw = (f64::from(count) * rate).ceil();
    if raw <= 0.0 {
        0
    } else if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}
