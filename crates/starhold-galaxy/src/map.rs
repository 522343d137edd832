//! Galaxy graph: territories as nodes, warp lanes as undirected edges.
//!
//! The [`GalaxyMap`] is the spatial backbone of a match. Territories live
//! in a flat arena keyed by stable integer ids; adjacency is kept as a
//! sorted neighbor list on each [`Territory`] record and maintained
//! exclusively by [`GalaxyMap::add_lane`], so the map is the single
//! authority for the graph shape. Lane records carry a distance used by
//! the weighted pathfinding branch; maps built with uniform distances
//! take the cheaper breadth-first branch.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use starhold_types::{Territory, TerritoryId};

use crate::error::GalaxyError;

/// An undirected edge between two territories.
///
/// Endpoints are stored normalized (lower id first) so each lane exists
/// exactly once regardless of insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpLane {
    /// Lower-id endpoint.
    pub a: TerritoryId,
    /// Higher-id endpoint.
    pub b: TerritoryId,
    /// Traversal cost; uniform distances enable breadth-first search.
    pub distance: u32,
}

/// The galaxy graph holding all territories and warp lanes.
#[derive(Debug, Clone)]
pub struct GalaxyMap {
    /// All territories indexed by their stable arena id.
    territories: BTreeMap<TerritoryId, Territory>,
    /// All lanes keyed by normalized endpoint pair (lower id first).
    lanes: BTreeMap<(TerritoryId, TerritoryId), WarpLane>,
}

impl GalaxyMap {
    /// Create an empty galaxy map.
    pub const fn new() -> Self {
        Self {
            territories: BTreeMap::new(),
            lanes: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Territory operations
    // -------------------------------------------------------------------

    /// Add a territory to the map.
    ///
    /// The territory's neighbor list should be empty; adjacency is
    /// maintained by [`GalaxyMap::add_lane`].
    ///
    /// # Errors
    ///
    /// Returns [`GalaxyError::DuplicateTerritory`] if a territory with
    /// the same id already exists.
    pub fn add_territory(&mut self, territory: Territory) -> Result<(), GalaxyError> {
        let id = territory.id;
        if self.territories.contains_key(&id) {
            return Err(GalaxyError::DuplicateTerritory(id));
        }
        self.territories.insert(id, territory);
        Ok(())
    }

    /// Get an immutable reference to a territory.
    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Get a mutable reference to a territory.
    pub fn get_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(&id)
    }

    /// Get an immutable reference to a territory, or a typed error.
    pub fn territory(&self, id: TerritoryId) -> Result<&Territory, GalaxyError> {
        self.territories
            .get(&id)
            .ok_or(GalaxyError::TerritoryNotFound(id))
    }

    /// Get a mutable reference to a territory, or a typed error.
    pub fn territory_mut(&mut self, id: TerritoryId) -> Result<&mut Territory, GalaxyError> {
        self.territories
            .get_mut(&id)
            .ok_or(GalaxyError::TerritoryNotFound(id))
    }

    /// Whether the map contains the given territory id.
    pub fn contains(&self, id: TerritoryId) -> bool {
        self.territories.contains_key(&id)
    }

    /// Return the number of territories in the map.
    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    /// Return all territory ids, ascending.
    pub fn territory_ids(&self) -> Vec<TerritoryId> {
        self.territories.keys().copied().collect()
    }

    /// Iterate over all territories immutably, ascending by id.
    pub fn territories(&self) -> impl Iterator<Item = (&TerritoryId, &Territory)> {
        self.territories.iter()
    }

    /// Iterate over all territories mutably, ascending by id.
    pub fn territories_mut(&mut self) -> impl Iterator<Item = (&TerritoryId, &mut Territory)> {
        self.territories.iter_mut()
    }

    // -------------------------------------------------------------------
    // Lane operations
    // -------------------------------------------------------------------

    /// Add an undirected warp lane between two existing territories.
    ///
    /// Inserts each endpoint into the other's sorted neighbor list.
    ///
    /// # Errors
    ///
    /// Returns [`GalaxyError::TerritoryNotFound`] if either endpoint is
    /// missing, [`GalaxyError::SelfLane`] if the endpoints are equal, or
    /// [`GalaxyError::DuplicateLane`] if the lane already exists.
    pub fn add_lane(
        &mut self,
        a: TerritoryId,
        b: TerritoryId,
        distance: u32,
    ) -> Result<(), GalaxyError> {
        if a == b {
            return Err(GalaxyError::SelfLane(a));
        }
        if !self.territories.contains_key(&a) {
            return Err(GalaxyError::TerritoryNotFound(a));
        }
        if !self.territories.contains_key(&b) {
            return Err(GalaxyError::TerritoryNotFound(b));
        }

        let key = normalize(a, b);
        if self.lanes.contains_key(&key) {
            return Err(GalaxyError::DuplicateLane { a, b });
        }

        self.lanes.insert(
            key,
            WarpLane {
                a: key.0,
                b: key.1,
                distance,
            },
        );
        self.link_neighbor(a, b)?;
        self.link_neighbor(b, a)?;
        Ok(())
    }

    /// Insert `neighbor` into `id`'s sorted neighbor list.
    fn link_neighbor(
        &mut self,
        id: TerritoryId,
        neighbor: TerritoryId,
    ) -> Result<(), GalaxyError> {
        let territory = self.territory_mut(id)?;
        if let Err(pos) = territory.neighbors.binary_search(&neighbor) {
            territory.neighbors.insert(pos, neighbor);
        }
        Ok(())
    }

    /// Return the number of lanes in the map.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Iterate over all lanes, ascending by normalized endpoint pair.
    pub fn lanes(&self) -> impl Iterator<Item = &WarpLane> {
        self.lanes.values()
    }

    /// The traversal distance of the lane between two territories, if
    /// one exists.
    pub fn lane_distance(&self, a: TerritoryId, b: TerritoryId) -> Option<u32> {
        self.lanes.get(&normalize(a, b)).map(|lane| lane.distance)
    }

    /// Whether every lane carries the same traversal distance.
    ///
    /// An empty lane set counts as uniform.
    pub fn uniform_lane_distances(&self) -> bool {
        let mut distances = self.lanes.values().map(|lane| lane.distance);
        distances.next().is_none_or(|first| {
            self.lanes.values().all(|lane| lane.distance == first)
        })
    }

    // -------------------------------------------------------------------
    // Graph queries
    // -------------------------------------------------------------------

    /// The ids of territories directly reachable from the given
    /// territory, ascending. Empty when the id is unknown.
    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        self.territories
            .get(&id)
            .map_or(&[], |territory| territory.neighbors.as_slice())
    }

    /// Whether two territories share a warp lane.
    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.lanes.contains_key(&normalize(a, b))
    }

    /// Whether every territory is reachable from every other territory.
    ///
    /// Returns `true` for an empty map.
    pub fn is_connected(&self) -> bool {
        let Some(&start) = self.territories.keys().next() else {
            return true;
        };

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for &neighbor in self.neighbors(current) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited.len() == self.territories.len()
    }
}

impl Default for GalaxyMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Order an endpoint pair with the lower id first.
const fn normalize(a: TerritoryId, b: TerritoryId) -> (TerritoryId, TerritoryId) {
    if a.0 <= b.0 { (a, b) } else { (b, a) }
}
