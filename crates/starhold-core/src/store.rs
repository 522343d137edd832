//! Canonical mutable game state for one room.
//!
//! The store bundles the territory graph with players, probes, and
//! supply routes, and exposes invariant-preserving mutators only. It
//! carries no simulation rules: combat, supply, and policy modules
//! decide *what* changes, the store guarantees the change lands
//! consistently.
//!
//! Invariants maintained at every mutation:
//!
//! - a territory's owner and the owning player's territory set agree
//!   (`owner == None` iff the territory is in no player's set)
//! - probes and routes only reference territories and players that exist
//! - every mutation marks the affected entities dirty for delta sync
//!
//! The store is exclusively owned by its room's tick loop and is never
//! touched concurrently.

use std::collections::{BTreeMap, BTreeSet};

use starhold_galaxy::GalaxyMap;
use starhold_types::{Player, PlayerId, Probe, ProbeId, SupplyRoute, Territory, TerritoryId};

/// Errors that can occur during store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced territory does not exist.
    #[error("territory {0} not found")]
    TerritoryNotFound(TerritoryId),

    /// A referenced player does not exist.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// A referenced probe does not exist.
    #[error("probe {0} not found")]
    ProbeNotFound(ProbeId),

    /// A player with this id is already registered.
    #[error("player {0} already registered")]
    DuplicatePlayer(PlayerId),

    /// An army or id counter would overflow.
    #[error("arithmetic overflow in store mutation")]
    ArithmeticOverflow,
}

/// Per-entity sets of ids mutated since the last successful broadcast.
///
/// Removal sets carry entities deleted since the last broadcast so
/// clients can drop them; an entity never appears in both its update
/// and removal set at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySets {
    /// Territories whose state changed.
    pub territories: BTreeSet<TerritoryId>,
    /// Players whose state changed.
    pub players: BTreeSet<PlayerId>,
    /// Probes created or updated.
    pub probes: BTreeSet<ProbeId>,
    /// Supply routes created or updated, keyed by origin.
    pub routes: BTreeSet<TerritoryId>,
    /// Probes removed.
    pub removed_probes: BTreeSet<ProbeId>,
    /// Supply routes removed, keyed by origin.
    pub removed_routes: BTreeSet<TerritoryId>,
}

impl DirtySets {
    /// Whether nothing has changed since the last broadcast.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
            && self.players.is_empty()
            && self.probes.is_empty()
            && self.routes.is_empty()
            && self.removed_probes.is_empty()
            && self.removed_routes.is_empty()
    }
}

/// What a reconciliation pass had to repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Territories whose owner referenced an unknown player.
    pub territories_neutralized: u32,
    /// Players whose territory set disagreed with territory owners.
    pub rosters_rebuilt: u32,
    /// Capital flags cleared because a player held more than one.
    pub capitals_demoted: u32,
}

impl DriftReport {
    /// Whether the pass found nothing to repair.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.territories_neutralized == 0 && self.rosters_rebuilt == 0 && self.capitals_demoted == 0
    }
}

/// Canonical mutable entity graph for one room.
#[derive(Debug, Clone)]
pub struct StateStore {
    map: GalaxyMap,
    players: BTreeMap<PlayerId, Player>,
    probes: BTreeMap<ProbeId, Probe>,
    routes: BTreeMap<TerritoryId, SupplyRoute>,
    next_probe: u64,
    dirty: DirtySets,
}

impl StateStore {
    /// Create a store over a generated map with no players yet.
    #[must_use]
    pub fn new(map: GalaxyMap) -> Self {
        Self {
            map,
            players: BTreeMap::new(),
            probes: BTreeMap::new(),
            routes: BTreeMap::new(),
            next_probe: 0,
            dirty: DirtySets::default(),
        }
    }

    // ---- read access ------------------------------------------------------

    /// The territory graph.
    #[must_use]
    pub const fn map(&self) -> &GalaxyMap {
        &self.map
    }

    /// Look up a territory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerritoryNotFound`] for an unknown id.
    pub fn territory(&self, id: TerritoryId) -> Result<&Territory, StoreError> {
        self.map.get(id).ok_or(StoreError::TerritoryNotFound(id))
    }

    /// Look up a player.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlayerNotFound`] for an unknown id.
    pub fn player(&self, id: PlayerId) -> Result<&Player, StoreError> {
        self.players.get(&id).ok_or(StoreError::PlayerNotFound(id))
    }

    /// Iterate over all players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Iterate over players that have not been eliminated.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|player| !player.eliminated)
    }

    /// Look up a probe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProbeNotFound`] for an unknown id.
    pub fn probe(&self, id: ProbeId) -> Result<&Probe, StoreError> {
        self.probes.get(&id).ok_or(StoreError::ProbeNotFound(id))
    }

    /// Iterate over all in-flight probes in id order.
    pub fn probes(&self) -> impl Iterator<Item = &Probe> {
        self.probes.values()
    }

    /// The active supply route originating at a territory, if any.
    #[must_use]
    pub fn route(&self, origin: TerritoryId) -> Option<&SupplyRoute> {
        self.routes.get(&origin)
    }

    /// Iterate over all active supply routes in origin order.
    pub fn routes(&self) -> impl Iterator<Item = &SupplyRoute> {
        self.routes.values()
    }

    /// Number of active routes owned by a player.
    #[must_use]
    pub fn route_count_for(&self, player: PlayerId) -> u32 {
        let count = self
            .routes
            .values()
            .filter(|route| route.owner == player)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Entities mutated since the last successful broadcast.
    #[must_use]
    pub const fn dirty(&self) -> &DirtySets {
        &self.dirty
    }

    /// Forget all dirty marks. Call only after a successful broadcast.
    pub fn clear_dirty(&mut self) {
        self.dirty = DirtySets::default();
    }

    // ---- player mutators --------------------------------------------------

    /// Register a player.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicatePlayer`] if the id is taken.
    pub fn add_player(&mut self, player: Player) -> Result<(), StoreError> {
        let id = player.id;
        if self.players.contains_key(&id) {
            return Err(StoreError::DuplicatePlayer(id));
        }
        self.players.insert(id, player);
        self.dirty.players.insert(id);
        Ok(())
    }

    /// Mark a player eliminated. Their territories, probes, and routes
    /// are handled separately by the room's elimination policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlayerNotFound`] for an unknown id.
    pub fn mark_eliminated(&mut self, id: PlayerId) -> Result<(), StoreError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(StoreError::PlayerNotFound(id))?;
        player.eliminated = true;
        self.dirty.players.insert(id);
        Ok(())
    }

    // ---- territory mutators -----------------------------------------------

    /// Change a territory's owner, keeping both ownership directions in
    /// sync. Returns the previous owner. The army is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerritoryNotFound`] or
    /// [`StoreError::PlayerNotFound`] when a reference is unknown.
    pub fn set_owner(
        &mut self,
        id: TerritoryId,
        owner: Option<PlayerId>,
    ) -> Result<Option<PlayerId>, StoreError> {
        if let Some(player_id) = owner {
            if !self.players.contains_key(&player_id) {
                return Err(StoreError::PlayerNotFound(player_id));
            }
        }
        let territory = self
            .map
            .get_mut(id)
            .ok_or(StoreError::TerritoryNotFound(id))?;
        let previous = territory.owner;
        if previous == owner {
            return Ok(previous);
        }
        territory.owner = owner;

        if let Some(prev_id) = previous {
            if let Some(prev) = self.players.get_mut(&prev_id) {
                prev.territories.remove(&id);
                self.dirty.players.insert(prev_id);
            }
        }
        if let Some(new_id) = owner {
            if let Some(new) = self.players.get_mut(&new_id) {
                new.territories.insert(id);
                self.dirty.players.insert(new_id);
            }
        }
        self.dirty.territories.insert(id);
        Ok(previous)
    }

    /// Set a territory's army to an exact value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerritoryNotFound`] for an unknown id.
    pub fn set_army(&mut self, id: TerritoryId, armies: u32) -> Result<(), StoreError> {
        let territory = self
            .map
            .get_mut(id)
            .ok_or(StoreError::TerritoryNotFound(id))?;
        territory.army_size = armies;
        self.dirty.territories.insert(id);
        Ok(())
    }

    /// Add armies to a territory. Returns the new army size.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerritoryNotFound`] for an unknown id or
    /// [`StoreError::ArithmeticOverflow`] if the army would overflow.
    pub fn add_army(&mut self, id: TerritoryId, amount: u32) -> Result<u32, StoreError> {
        let territory = self
            .map
            .get_mut(id)
            .ok_or(StoreError::TerritoryNotFound(id))?;
        territory.army_size = territory
            .army_size
            .checked_add(amount)
            .ok_or(StoreError::ArithmeticOverflow)?;
        self.dirty.territories.insert(id);
        Ok(territory.army_size)
    }

    /// Hand a territory to a player with an exact army, as one mutation.
    ///
    /// # Errors
    ///
    /// Propagates the underlying [`set_owner`](Self::set_owner) and
    /// [`set_army`](Self::set_army) errors.
    pub fn transfer_territory(
        &mut self,
        id: TerritoryId,
        to: PlayerId,
        armies: u32,
    ) -> Result<(), StoreError> {
        let _previous = self.set_owner(id, Some(to))?;
        self.set_army(id, armies)
    }

    /// Clear a territory's capital flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TerritoryNotFound`] for an unknown id.
    pub fn clear_capital(&mut self, id: TerritoryId) -> Result<(), StoreError> {
        let territory = self
            .map
            .get_mut(id)
            .ok_or(StoreError::TerritoryNotFound(id))?;
        if territory.capital {
            territory.capital = false;
            self.dirty.territories.insert(id);
        }
        Ok(())
    }

    // ---- probe mutators ---------------------------------------------------

    /// Insert an in-flight probe, allocating its id from the room
    /// counter.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if a referenced entity is unknown, or
    /// [`StoreError::ArithmeticOverflow`] if the id counter is spent.
    pub fn insert_probe(
        &mut self,
        origin: TerritoryId,
        destination: TerritoryId,
        owner: PlayerId,
        launch_tick: u64,
        duration_ticks: u64,
        armies: u32,
    ) -> Result<ProbeId, StoreError> {
        if !self.map.contains(origin) {
            return Err(StoreError::TerritoryNotFound(origin));
        }
        if !self.map.contains(destination) {
            return Err(StoreError::TerritoryNotFound(destination));
        }
        if !self.players.contains_key(&owner) {
            return Err(StoreError::PlayerNotFound(owner));
        }

        let id = ProbeId::new(self.next_probe);
        self.next_probe = self
            .next_probe
            .checked_add(1)
            .ok_or(StoreError::ArithmeticOverflow)?;

        self.probes.insert(
            id,
            Probe {
                id,
                origin,
                destination,
                owner,
                progress: 0.0,
                launch_tick,
                duration_ticks,
                armies,
            },
        );
        self.dirty.probes.insert(id);
        Ok(id)
    }

    /// Mutable access to a probe, marking it dirty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProbeNotFound`] for an unknown id.
    pub fn probe_mut(&mut self, id: ProbeId) -> Result<&mut Probe, StoreError> {
        let probe = self
            .probes
            .get_mut(&id)
            .ok_or(StoreError::ProbeNotFound(id))?;
        self.dirty.probes.insert(id);
        Ok(probe)
    }

    /// Remove a probe (arrival, dissolution, or owner elimination).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProbeNotFound`] for an unknown id.
    pub fn remove_probe(&mut self, id: ProbeId) -> Result<Probe, StoreError> {
        let probe = self.probes.remove(&id).ok_or(StoreError::ProbeNotFound(id))?;
        self.dirty.probes.remove(&id);
        self.dirty.removed_probes.insert(id);
        Ok(probe)
    }

    // ---- route mutators ---------------------------------------------------

    /// Install a supply route, replacing any route from the same origin.
    /// Returns the replaced route, if there was one.
    pub fn insert_route(&mut self, route: SupplyRoute) -> Option<SupplyRoute> {
        let origin = route.origin;
        let replaced = self.routes.insert(origin, route);
        // A replacement supersedes a same-boundary removal.
        self.dirty.removed_routes.remove(&origin);
        self.dirty.routes.insert(origin);
        replaced
    }

    /// Mutable access to a route, marking it dirty.
    #[must_use]
    pub fn route_mut(&mut self, origin: TerritoryId) -> Option<&mut SupplyRoute> {
        let route = self.routes.get_mut(&origin)?;
        self.dirty.routes.insert(origin);
        Some(route)
    }

    /// Tear down the route originating at a territory, if any.
    pub fn remove_route(&mut self, origin: TerritoryId) -> Option<SupplyRoute> {
        let removed = self.routes.remove(&origin)?;
        self.dirty.routes.remove(&origin);
        self.dirty.removed_routes.insert(origin);
        Some(removed)
    }

    // ---- reconciliation ---------------------------------------------------

    /// Rebuild derived ownership state from territory owners.
    ///
    /// Repairs, in order: territory owners referencing unknown players
    /// (neutralized), player territory sets disagreeing with territory
    /// owners (rebuilt), and players holding more than one capital (all
    /// but the lowest-id capital demoted). Every repair marks the
    /// affected entities dirty. Mutation-site invariants make this a
    /// no-op in a healthy room.
    pub fn reconcile(&mut self) -> DriftReport {
        let mut report = DriftReport::default();

        // Neutralize owners that point at unregistered players.
        let known: BTreeSet<PlayerId> = self.players.keys().copied().collect();
        let mut neutralized: Vec<TerritoryId> = Vec::new();
        for (id, territory) in self.map.territories_mut() {
            if territory.owner.is_some_and(|owner| !known.contains(&owner)) {
                territory.owner = None;
                neutralized.push(*id);
            }
        }
        for id in neutralized {
            self.dirty.territories.insert(id);
            report.territories_neutralized = report.territories_neutralized.saturating_add(1);
        }

        // Rebuild each player's territory set from territory owners.
        let mut owned: BTreeMap<PlayerId, BTreeSet<TerritoryId>> = self
            .players
            .keys()
            .map(|id| (*id, BTreeSet::new()))
            .collect();
        for (id, territory) in self.map.territories() {
            if let Some(owner) = territory.owner {
                if let Some(set) = owned.get_mut(&owner) {
                    set.insert(*id);
                }
            }
        }
        for (player_id, set) in owned {
            if let Some(player) = self.players.get_mut(&player_id) {
                if player.territories != set {
                    player.territories = set;
                    self.dirty.players.insert(player_id);
                    report.rosters_rebuilt = report.rosters_rebuilt.saturating_add(1);
                }
            }
        }

        // Demote surplus capitals, keeping the lowest territory id.
        let mut capital_seen: BTreeSet<PlayerId> = BTreeSet::new();
        let mut demoted: Vec<TerritoryId> = Vec::new();
        for (id, territory) in self.map.territories() {
            let Some(owner) = territory.owner else {
                continue;
            };
            if territory.capital && !capital_seen.insert(owner) {
                demoted.push(*id);
            }
        }
        for id in demoted {
            if let Some(territory) = self.map.get_mut(id) {
                territory.capital = false;
                self.dirty.territories.insert(id);
                report.capitals_demoted = report.capitals_demoted.saturating_add(1);
            }
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::Utc;
    use starhold_galaxy::GalaxyMap;
    use starhold_types::{PlayerKind, Position};

    use super::*;

    fn make_territory(id: u32) -> Territory {
        Territory {
            id: TerritoryId::new(id),
            position: Position {
                x: f64::from(id) * 100.0,
                y: 0.0,
            },
            owner: None,
            army_size: 2,
            radius: 18.0,
            neighbors: Vec::new(),
            colonizable: true,
            capital: false,
        }
    }

    fn make_player(name: &str) -> Player {
        Player {
            id: PlayerId::new(),
            name: name.to_owned(),
            color: "#ff0000".to_owned(),
            kind: PlayerKind::Human,
            territories: BTreeSet::new(),
            eliminated: false,
            ready: true,
            joined_at: Utc::now(),
        }
    }

    fn make_store(territories: u32) -> StateStore {
        let mut map = GalaxyMap::new();
        for id in 0..territories {
            map.add_territory(make_territory(id)).unwrap();
        }
        for id in 1..territories {
            map.add_lane(TerritoryId::new(id - 1), TerritoryId::new(id), 1)
                .unwrap();
        }
        StateStore::new(map)
    }

    fn make_route(origin: u32, destination: u32, owner: PlayerId) -> SupplyRoute {
        SupplyRoute {
            origin: TerritoryId::new(origin),
            destination: TerritoryId::new(destination),
            owner,
            path: (origin..=destination).map(TerritoryId::new).collect(),
            active: true,
            created_tick: 1,
            shipments: Vec::new(),
        }
    }

    /// The P1 check: territory owners and player sets must agree.
    fn assert_ownership_consistent(store: &StateStore) {
        for (id, territory) in store.map().territories() {
            let holders: Vec<PlayerId> = store
                .players()
                .filter(|player| player.territories.contains(id))
                .map(|player| player.id)
                .collect();
            match territory.owner {
                Some(owner) => assert_eq!(holders, vec![owner], "territory {id}"),
                None => assert!(holders.is_empty(), "territory {id}"),
            }
        }
    }

    #[test]
    fn set_owner_keeps_both_directions_in_sync() {
        let mut store = make_store(3);
        let alice = make_player("Alice");
        let bob = make_player("Bob");
        let (a, b) = (alice.id, bob.id);
        store.add_player(alice).unwrap();
        store.add_player(bob).unwrap();
        let t0 = TerritoryId::new(0);

        assert_eq!(store.set_owner(t0, Some(a)).unwrap(), None);
        assert!(store.player(a).unwrap().territories.contains(&t0));
        assert_ownership_consistent(&store);

        assert_eq!(store.set_owner(t0, Some(b)).unwrap(), Some(a));
        assert!(!store.player(a).unwrap().territories.contains(&t0));
        assert!(store.player(b).unwrap().territories.contains(&t0));
        assert_ownership_consistent(&store);

        assert_eq!(store.set_owner(t0, None).unwrap(), Some(b));
        assert!(store.player(b).unwrap().territories.is_empty());
        assert_ownership_consistent(&store);
    }

    #[test]
    fn ownership_stays_consistent_through_mutations() {
        let mut store = make_store(5);
        let alice = make_player("Alice");
        let bob = make_player("Bob");
        let (a, b) = (alice.id, bob.id);
        store.add_player(alice).unwrap();
        store.add_player(bob).unwrap();

        for id in 0..3 {
            store.set_owner(TerritoryId::new(id), Some(a)).unwrap();
        }
        store.transfer_territory(TerritoryId::new(1), b, 7).unwrap();
        store.set_owner(TerritoryId::new(3), Some(b)).unwrap();
        store.set_owner(TerritoryId::new(0), None).unwrap();
        store.add_army(TerritoryId::new(2), 5).unwrap();

        assert_ownership_consistent(&store);
        assert_eq!(store.player(a).unwrap().territories.len(), 1);
        assert_eq!(store.player(b).unwrap().territories.len(), 2);
        assert_eq!(store.territory(TerritoryId::new(1)).unwrap().army_size, 7);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let mut store = make_store(2);
        let ghost = PlayerId::new();
        assert!(matches!(
            store.set_owner(TerritoryId::new(0), Some(ghost)),
            Err(StoreError::PlayerNotFound(_))
        ));
        assert!(matches!(
            store.set_army(TerritoryId::new(9), 5),
            Err(StoreError::TerritoryNotFound(_))
        ));
        let player = make_player("Alice");
        let id = player.id;
        store.add_player(player).unwrap();
        let mut duplicate = make_player("Imposter");
        duplicate.id = id;
        assert!(matches!(
            store.add_player(duplicate),
            Err(StoreError::DuplicatePlayer(_))
        ));
        assert!(matches!(
            store.insert_probe(TerritoryId::new(0), TerritoryId::new(9), id, 1, 4, 10),
            Err(StoreError::TerritoryNotFound(_))
        ));
    }

    #[test]
    fn mutators_mark_entities_dirty() {
        let mut store = make_store(3);
        let player = make_player("Alice");
        let id = player.id;
        store.add_player(player).unwrap();
        store.clear_dirty();
        assert!(store.dirty().is_empty());

        store.set_owner(TerritoryId::new(0), Some(id)).unwrap();
        assert!(store.dirty().territories.contains(&TerritoryId::new(0)));
        assert!(store.dirty().players.contains(&id));

        store.clear_dirty();
        store.add_army(TerritoryId::new(1), 4).unwrap();
        assert!(store.dirty().territories.contains(&TerritoryId::new(1)));
        assert!(!store.dirty().players.contains(&id));
    }

    #[test]
    fn probe_lifecycle_tracks_removals() {
        let mut store = make_store(2);
        let player = make_player("Alice");
        let owner = player.id;
        store.add_player(player).unwrap();
        store.clear_dirty();

        let probe_id = store
            .insert_probe(TerritoryId::new(0), TerritoryId::new(1), owner, 3, 6, 10)
            .unwrap();
        assert!(store.dirty().probes.contains(&probe_id));
        assert_eq!(store.probe(probe_id).unwrap().armies, 10);

        let removed = store.remove_probe(probe_id).unwrap();
        assert_eq!(removed.id, probe_id);
        assert!(!store.dirty().probes.contains(&probe_id));
        assert!(store.dirty().removed_probes.contains(&probe_id));
        assert!(store.probe(probe_id).is_err());
    }

    #[test]
    fn probe_ids_are_sequential() {
        let mut store = make_store(2);
        let player = make_player("Alice");
        let owner = player.id;
        store.add_player(player).unwrap();

        let first = store
            .insert_probe(TerritoryId::new(0), TerritoryId::new(1), owner, 1, 4, 10)
            .unwrap();
        let second = store
            .insert_probe(TerritoryId::new(0), TerritoryId::new(1), owner, 1, 4, 10)
            .unwrap();
        assert_eq!(first, ProbeId::new(0));
        assert_eq!(second, ProbeId::new(1));
    }

    #[test]
    fn route_replacement_returns_the_old_route() {
        let mut store = make_store(4);
        let player = make_player("Alice");
        let owner = player.id;
        store.add_player(player).unwrap();

        assert!(store.insert_route(make_route(0, 2, owner)).is_none());
        let replaced = store.insert_route(make_route(0, 3, owner)).unwrap();
        assert_eq!(replaced.destination, TerritoryId::new(2));
        assert_eq!(store.routes().count(), 1);
        assert_eq!(
            store.route(TerritoryId::new(0)).unwrap().destination,
            TerritoryId::new(3)
        );
    }

    #[test]
    fn route_removal_supersedes_update_marks() {
        let mut store = make_store(4);
        let player = make_player("Alice");
        let owner = player.id;
        store.add_player(player).unwrap();
        store.insert_route(make_route(0, 2, owner));
        store.clear_dirty();

        store.route_mut(TerritoryId::new(0)).unwrap().active = true;
        assert!(store.dirty().routes.contains(&TerritoryId::new(0)));

        store.remove_route(TerritoryId::new(0)).unwrap();
        assert!(!store.dirty().routes.contains(&TerritoryId::new(0)));
        assert!(store.dirty().removed_routes.contains(&TerritoryId::new(0)));

        // Re-creating on the same boundary flips it back to an update.
        store.insert_route(make_route(0, 3, owner));
        assert!(store.dirty().routes.contains(&TerritoryId::new(0)));
        assert!(!store.dirty().removed_routes.contains(&TerritoryId::new(0)));
    }

    #[test]
    fn reconcile_is_clean_on_a_healthy_store() {
        let mut store = make_store(4);
        let player = make_player("Alice");
        let id = player.id;
        store.add_player(player).unwrap();
        store.set_owner(TerritoryId::new(0), Some(id)).unwrap();
        store.set_owner(TerritoryId::new(1), Some(id)).unwrap();

        let report = store.reconcile();
        assert!(report.is_clean());
    }

    #[test]
    fn reconcile_rebuilds_a_corrupted_roster() {
        let mut store = make_store(4);
        // Seed a player whose claimed set disagrees with territory owners.
        let mut player = make_player("Alice");
        let id = player.id;
        player.territories.insert(TerritoryId::new(3));
        store.add_player(player).unwrap();
        store.clear_dirty();

        let report = store.reconcile();
        assert_eq!(report.rosters_rebuilt, 1);
        assert!(store.player(id).unwrap().territories.is_empty());
        assert!(store.dirty().players.contains(&id));
    }

    #[test]
    fn reconcile_neutralizes_ghost_owners_and_demotes_capitals() {
        let mut map = GalaxyMap::new();
        let ghost = PlayerId::new();
        let mut t0 = make_territory(0);
        t0.owner = Some(ghost);
        map.add_territory(t0).unwrap();
        map.add_territory(make_territory(1)).unwrap();
        map.add_territory(make_territory(2)).unwrap();

        let mut store = StateStore::new(map);
        let player = make_player("Alice");
        let id = player.id;
        store.add_player(player).unwrap();
        store.set_owner(TerritoryId::new(1), Some(id)).unwrap();
        store.set_owner(TerritoryId::new(2), Some(id)).unwrap();
        if let Some(t) = store.map.get_mut(TerritoryId::new(1)) {
            t.capital = true;
        }
        if let Some(t) = store.map.get_mut(TerritoryId::new(2)) {
            t.capital = true;
        }

        let report = store.reconcile();
        assert_eq!(report.territories_neutralized, 1);
        assert_eq!(report.capitals_demoted, 1);
        assert!(store.territory(TerritoryId::new(0)).unwrap().owner.is_none());
        assert!(store.territory(TerritoryId::new(1)).unwrap().capital);
        assert!(!store.territory(TerritoryId::new(2)).unwrap().capital);
    }
}
