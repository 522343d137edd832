//! Command validation and execution.
//!
//! Commands drain from the room's FIFO queue at tick boundaries and run
//! through a staged pipeline: player existence, non-elimination,
//! territory existence, then command-specific preconditions. Every
//! check reads the store as it stands at execution time, so a command
//! validated against the state the client saw can still fail here.
//!
//! Failures split two ways. A [`CommandRejection`] is client-visible
//! and private to the originator. A [`StoreError`] after validation
//! passed means the store refused a mutation it should have accepted;
//! the caller responds with a reconciliation pass, not a crash.

use chrono::Utc;
use rand::Rng;
use starhold_galaxy::{PathMode, find_path};
use starhold_types::{
    Command, CommandKind, CombatBroadcast, CombatOutcome, CommandRejection, PlayerId, TerritoryId,
};

use crate::combat;
use crate::config::{EngineConfig, ProbeSettings};
use crate::store::{StateStore, StoreError};
use crate::supply;

/// A sole capital changing hands, reported so the room can apply the
/// configured capital mechanic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapitalCapture {
    /// The captured capital territory.
    pub territory: TerritoryId,
    /// The player who captured it.
    pub captor: PlayerId,
    /// The player who lost it.
    pub previous_owner: PlayerId,
}

/// Side effects of a successfully applied command.
#[derive(Debug, Default)]
pub struct ExecuteOutcome {
    /// A resolved attack to broadcast immediately.
    pub combat: Option<CombatBroadcast>,
    /// A capital capture for the room to act on.
    pub capital_captured: Option<CapitalCapture>,
}

/// How a command failed.
#[derive(Debug)]
pub enum CommandFailure {
    /// Validation failed; the originator receives the reason.
    Rejected(CommandRejection),
    /// A mutator refused after validation passed. Signals state drift;
    /// the caller runs a reconciliation pass.
    Internal(StoreError),
}

impl From<CommandRejection> for CommandFailure {
    fn from(rejection: CommandRejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<StoreError> for CommandFailure {
    fn from(error: StoreError) -> Self {
        Self::Internal(error)
    }
}

/// Drains queued commands against the live store, one tick at a time.
///
/// The processor tracks whether ownership changed earlier in the same
/// tick. When it did, a failed path lookup classifies as a transient
/// invalidation rather than a hard "no path", because the path the
/// client saw may have existed when the command was issued.
#[derive(Debug, Default)]
pub struct CommandProcessor {
    ownership_changed: bool,
}

impl CommandProcessor {
    /// Create a processor for a fresh room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-tick tracking; call once at the top of each tick.
    pub fn begin_tick(&mut self) {
        self.ownership_changed = false;
    }

    /// Whether a command earlier in this tick changed territory
    /// ownership.
    #[must_use]
    pub const fn ownership_changed(&self) -> bool {
        self.ownership_changed
    }

    /// Validate and apply one command.
    ///
    /// # Errors
    ///
    /// [`CommandFailure::Rejected`] for client-visible validation
    /// failures, [`CommandFailure::Internal`] when the store refuses a
    /// mutation after validation passed.
    pub fn execute(
        &mut self,
        store: &mut StateStore,
        config: &EngineConfig,
        tick: u64,
        rng: &mut impl Rng,
        player_id: PlayerId,
        command: &Command,
    ) -> Result<ExecuteOutcome, CommandFailure> {
        let player = store
            .player(player_id)
            .map_err(|_| CommandRejection::UnknownPlayer(player_id))?;
        if player.eliminated {
            return Err(CommandRejection::PlayerEliminated.into());
        }

        let from = command.payload.from_territory_id;
        let to = command.payload.to_territory_id;
        if !store.map().contains(from) {
            return Err(CommandRejection::UnknownTerritory(from).into());
        }
        if !store.map().contains(to) {
            return Err(CommandRejection::UnknownTerritory(to).into());
        }

        match command.kind {
            CommandKind::AttackTerritory => self.attack(store, config, rng, player_id, from, to),
            CommandKind::TransferArmies => self.transfer(store, config, player_id, from, to),
            CommandKind::LaunchProbe => launch_probe(store, config, tick, player_id, from, to),
            CommandKind::CreateSupplyRoute => {
                self.create_route(store, config, tick, player_id, from, to)
            }
            CommandKind::CancelSupplyRoute => {
                supply::cancel_route(store, player_id, from)?;
                Ok(ExecuteOutcome::default())
            }
        }
    }

    /// Resolve an attack on an adjacent enemy or neutral territory.
    ///
    /// Adjacency is checked before army counts, so a non-adjacent
    /// target always reads "not adjacent" no matter how small the
    /// attacking garrison is.
    fn attack(
        &mut self,
        store: &mut StateStore,
        config: &EngineConfig,
        rng: &mut impl Rng,
        attacker: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
    ) -> Result<ExecuteOutcome, CommandFailure> {
        let source = store.territory(from)?;
        if source.owner != Some(attacker) {
            return Err(CommandRejection::NotOwner(from).into());
        }
        if from == to {
            return Err(CommandRejection::SelfTarget.into());
        }
        let target = store.territory(to)?;
        if target.owner == Some(attacker) {
            return Err(CommandRejection::TargetIsOwn(to).into());
        }
        if !store.map().are_adjacent(from, to) {
            return Err(CommandRejection::NotAdjacent { from, to }.into());
        }

        let floor = config.combat.garrison_floor;
        let have = store.territory(from)?.army_size;
        let need = floor.saturating_add(1);
        if have < need {
            return Err(CommandRejection::InsufficientArmies { have, need }.into());
        }
        let committed = have.saturating_sub(floor);

        let target = store.territory(to)?;
        let defender = target.owner;
        let defenders = target.army_size;
        let was_capital = target.capital;

        let resolved = combat::resolve_attack(committed, defenders, &config.combat, rng);
        combat::apply_attack(store, from, to, attacker, &resolved, floor)?;

        let mut outcome = ExecuteOutcome {
            combat: Some(CombatBroadcast {
                attacker_id: attacker,
                defender_id: defender,
                territory_id: to,
                outcome: resolved.outcome,
                casualties: resolved.casualties,
                timestamp: Utc::now(),
            }),
            capital_captured: None,
        };

        if resolved.outcome == CombatOutcome::AttackerWon {
            self.ownership_changed = true;
            supply::handle_capture(store, to, Some(attacker));
            if was_capital {
                // The flag moves off the territory so the captor never
                // ends up with two capitals; the room decides what the
                // loss means for the previous owner.
                store.clear_capital(to)?;
                if let Some(previous_owner) = defender {
                    outcome.capital_captured = Some(CapitalCapture {
                        territory: to,
                        captor: attacker,
                        previous_owner,
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Instantly move everything above the garrison floor to another
    /// owned territory along a fully-owned path.
    fn transfer(
        &self,
        store: &mut StateStore,
        config: &EngineConfig,
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
    ) -> Result<ExecuteOutcome, CommandFailure> {
        let source = store.territory(from)?;
        if source.owner != Some(player) {
            return Err(CommandRejection::NotOwner(from).into());
        }
        if from == to {
            return Err(CommandRejection::SelfTarget.into());
        }
        check_owned_destination(store, player, to)?;

        let floor = config.combat.garrison_floor;
        let have = store.territory(from)?.army_size;
        let need = floor.saturating_add(1);
        if have < need {
            return Err(CommandRejection::InsufficientArmies { have, need }.into());
        }

        // The path only proves connectivity; the move itself is instant.
        find_path(store.map(), from, to, PathMode::Strict, |t| {
            t.owner == Some(player)
        })
        .ok_or_else(|| self.path_rejection(from, to))?;

        let amount = have.saturating_sub(floor);
        store.set_army(from, floor)?;
        let _new_total = store.add_army(to, amount)?;
        Ok(ExecuteOutcome::default())
    }

    /// Create or replace the supply route originating at `from`.
    fn create_route(
        &self,
        store: &mut StateStore,
        config: &EngineConfig,
        tick: u64,
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
    ) -> Result<ExecuteOutcome, CommandFailure> {
        let source = store.territory(from)?;
        if source.owner != Some(player) {
            return Err(CommandRejection::NotOwner(from).into());
        }
        if from == to {
            return Err(CommandRejection::SelfTarget.into());
        }
        check_owned_destination(store, player, to)?;

        supply::create_route(store, &config.supply, player, from, to, tick).map_err(
            |rejection| match rejection {
                CommandRejection::NoPath { from, to } if self.ownership_changed => {
                    CommandFailure::Rejected(CommandRejection::TransientPath { from, to })
                }
                other => CommandFailure::Rejected(other),
            },
        )?;
        Ok(ExecuteOutcome::default())
    }

    /// Classify a failed path lookup.
    const fn path_rejection(&self, from: TerritoryId, to: TerritoryId) -> CommandFailure {
        if self.ownership_changed {
            CommandFailure::Rejected(CommandRejection::TransientPath { from, to })
        } else {
            CommandFailure::Rejected(CommandRejection::NoPath { from, to })
        }
    }
}

/// Launch a colonization probe at a colonizable neutral territory.
///
/// The source keeps at least one army, so the cost must be strictly
/// below the present garrison. The probe carries the cost as its
/// colony garrison and flies for `max(min duration, distance / speed)`
/// ticks.
fn launch_probe(
    store: &mut StateStore,
    config: &EngineConfig,
    tick: u64,
    player: PlayerId,
    from: TerritoryId,
    to: TerritoryId,
) -> Result<ExecuteOutcome, CommandFailure> {
    let source = store.territory(from)?;
    if source.owner != Some(player) {
        return Err(CommandRejection::NotOwner(from).into());
    }
    if from == to {
        return Err(CommandRejection::SelfTarget.into());
    }
    let target = store.territory(to)?;
    if target.owner.is_some() {
        return Err(CommandRejection::TargetOccupied(to).into());
    }
    if !target.colonizable {
        return Err(CommandRejection::NotColonizable(to).into());
    }

    let cost = config.probes.cost;
    let have = store.territory(from)?.army_size;
    let need = cost.saturating_add(1);
    if have < need {
        return Err(CommandRejection::InsufficientArmies { have, need }.into());
    }

    let distance = store
        .territory(from)?
        .position
        .distance_to(&store.territory(to)?.position);
    let duration = probe_duration(distance, &config.probes);

    store.set_army(from, have.saturating_sub(cost))?;
    let _id = store.insert_probe(from, to, player, tick, duration, cost)?;
    Ok(ExecuteOutcome::default())
}

/// Flight time in ticks for a probe covering `distance` map units.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn probe_duration(distance: f64, settings: &ProbeSettings) -> u64 {
    let travel = if settings.speed > 0.0 {
        (distance / settings.speed).round()
    } else {
        0.0
    };
    let travel = if travel.is_finite() && travel > 0.0 {
        travel as u64
    } else {
        0
    };
    travel.max(settings.min_duration_ticks)
}

/// Transfer and route destinations must belong to the acting player.
fn check_owned_destination(
    store: &StateStore,
    player: PlayerId,
    to: TerritoryId,
) -> Result<(), CommandFailure> {
    match store.territory(to)?.owner {
        None => Err(CommandRejection::NeutralTarget(to).into()),
        Some(owner) if owner != player => {
            Err(CommandRejection::DestinationNotOwned(to).into())
        }
        Some(_) => Ok(()),
    }
}
