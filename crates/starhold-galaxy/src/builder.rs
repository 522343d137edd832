//! Deterministic synthetic map generation for match setup.
//!
//! Layout aesthetics belong to the presentation layer; this builder only
//! guarantees the structural properties the simulation needs: a
//! connected graph, stable ascending ids, a colonizable neutral
//! fraction, and maximally-separated starting territories. Everything is
//! driven by the caller's RNG, so a seeded room reproduces its map
//! exactly.

use rand::Rng;
use starhold_types::{Position, Territory, TerritoryId};
use tracing::debug;

use crate::error::GalaxyError;
use crate::map::GalaxyMap;

/// Visual radius assigned to every generated territory.
const TERRITORY_RADIUS: f64 = 18.0;

/// Structural parameters for map generation.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    /// Number of territories to generate.
    pub territory_count: u32,
    /// Warp lanes linked from each territory to its nearest neighbors.
    pub lane_degree: u32,
    /// Map plane width in map units.
    pub width: f64,
    /// Map plane height in map units.
    pub height: f64,
    /// Garrison placed on each starting territory.
    pub base_army: u32,
    /// Garrison placed on each neutral territory.
    pub neutral_army: u32,
    /// Fraction of neutral territories that accept probes.
    pub colonizable_fraction: f64,
    /// Whether starting territories are flagged as capitals.
    pub capitals: bool,
}

impl Default for MapLayout {
    fn default() -> Self {
        Self {
            territory_count: 24,
            lane_degree: 3,
            width: 1600.0,
            height: 900.0,
            base_army: 10,
            neutral_army: 2,
            colonizable_fraction: 0.35,
            capitals: true,
        }
    }
}

/// A generated map plus the starting territory for each player slot.
#[derive(Debug, Clone)]
pub struct BuiltMap {
    /// The connected galaxy map.
    pub map: GalaxyMap,
    /// One starting territory per player slot, maximally separated.
    pub starting_territories: Vec<TerritoryId>,
}

/// Generate a connected map for `players` player slots.
///
/// Territories are scattered on a jittered grid, linked to their nearest
/// neighbors, and stitched into a single component. Starting territories
/// are chosen greedily for maximum mutual separation, garrisoned with
/// `base_army`, excluded from colonization, and flagged capital when the
/// layout says so. Ownership is assigned later by the room.
///
/// # Errors
///
/// Returns [`GalaxyError::EmptyMap`] for a zero territory count and
/// [`GalaxyError::InsufficientStarts`] when `players` exceeds the
/// territory count.
pub fn build_map(
    layout: &MapLayout,
    players: usize,
    rng: &mut impl Rng,
) -> Result<BuiltMap, GalaxyError> {
    if layout.territory_count == 0 {
        return Err(GalaxyError::EmptyMap);
    }
    let count = layout.territory_count;
    let available = usize::try_from(count).map_err(|_| GalaxyError::ArithmeticOverflow)?;
    if players > available {
        return Err(GalaxyError::InsufficientStarts {
            players,
            territories: available,
        });
    }

    let mut map = GalaxyMap::new();
    scatter_territories(&mut map, layout, rng)?;
    link_nearest_neighbors(&mut map, layout)?;
    stitch_components(&mut map)?;

    let starting_territories = place_starts(&mut map, layout, players)?;

    debug!(
        territories = map.territory_count(),
        lanes = map.lane_count(),
        starts = starting_territories.len(),
        "Generated galaxy map"
    );

    Ok(BuiltMap {
        map,
        starting_territories,
    })
}

/// Place territories on a jittered grid covering the map plane.
#[allow(clippy::arithmetic_side_effects)]
fn scatter_territories(
    map: &mut GalaxyMap,
    layout: &MapLayout,
    rng: &mut impl Rng,
) -> Result<(), GalaxyError> {
    let count = layout.territory_count;

    // Integer ceil-sqrt for the grid column count.
    let mut cols: u32 = 1;
    while cols.checked_mul(cols).is_some_and(|sq| sq < count) {
        cols = cols.saturating_add(1);
    }
    let rows = count.div_ceil(cols);

    let cell_w = layout.width / f64::from(cols.max(1));
    let cell_h = layout.height / f64::from(rows.max(1));
    let jitter_w = cell_w / 4.0;
    let jitter_h = cell_h / 4.0;
    let colonize_p = layout.colonizable_fraction.clamp(0.0, 1.0);

    for raw in 0..count {
        let col = raw.checked_rem(cols).ok_or(GalaxyError::ArithmeticOverflow)?;
        let row = raw.checked_div(cols).ok_or(GalaxyError::ArithmeticOverflow)?;
        let x = (f64::from(col) + 0.5) * cell_w + rng.random_range(-jitter_w..jitter_w);
        let y = (f64::from(row) + 0.5) * cell_h + rng.random_range(-jitter_h..jitter_h);

        map.add_territory(Territory {
            id: TerritoryId::new(raw),
            position: Position { x, y },
            owner: None,
            army_size: layout.neutral_army,
            radius: TERRITORY_RADIUS,
            neighbors: Vec::new(),
            colonizable: rng.random_bool(colonize_p),
            capital: false,
        })?;
    }
    Ok(())
}

/// Link each territory to its `lane_degree` nearest neighbors.
fn link_nearest_neighbors(map: &mut GalaxyMap, layout: &MapLayout) -> Result<(), GalaxyError> {
    let positions: Vec<(TerritoryId, Position)> = map
        .territories()
        .map(|(id, territory)| (*id, territory.position))
        .collect();
    let degree = usize::try_from(layout.lane_degree).map_err(|_| GalaxyError::ArithmeticOverflow)?;

    for &(id, position) in &positions {
        let mut candidates: Vec<(f64, TerritoryId)> = positions
            .iter()
            .filter(|(other, _)| *other != id)
            .map(|&(other, other_pos)| (position.distance_to(&other_pos), other))
            .collect();
        candidates.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0).then(lhs.1.cmp(&rhs.1)));

        for &(_, other) in candidates.iter().take(degree) {
            if !map.are_adjacent(id, other) {
                map.add_lane(id, other, 1)?;
            }
        }
    }
    Ok(())
}

/// Bridge disconnected components with the shortest possible lanes.
fn stitch_components(map: &mut GalaxyMap) -> Result<(), GalaxyError> {
    while !map.is_connected() {
        let reached = reachable_from_first(map);
        let positions: Vec<(TerritoryId, Position)> = map
            .territories()
            .map(|(id, territory)| (*id, territory.position))
            .collect();

        let mut best: Option<(f64, TerritoryId, TerritoryId)> = None;
        for &(inside, inside_pos) in positions.iter().filter(|(id, _)| reached.contains(id)) {
            for &(outside, outside_pos) in
                positions.iter().filter(|(id, _)| !reached.contains(id))
            {
                let d = inside_pos.distance_to(&outside_pos);
                let closer = best.is_none_or(|(bd, _, _)| d < bd);
                if closer {
                    best = Some((d, inside, outside));
                }
            }
        }

        // is_connected() was false, so an unreached territory exists.
        let Some((_, a, b)) = best else {
            return Err(GalaxyError::EmptyMap);
        };
        map.add_lane(a, b, 1)?;
    }
    Ok(())
}

/// Territories reachable from the lowest territory id.
fn reachable_from_first(map: &GalaxyMap) -> std::collections::BTreeSet<TerritoryId> {
    let mut visited = std::collections::BTreeSet::new();
    let Some(start) = map.territory_ids().first().copied() else {
        return visited;
    };
    let mut queue = std::collections::VecDeque::new();
    visited.insert(start);
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        for &neighbor in map.neighbors(current) {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited
}

/// Choose maximally-separated starts and prepare their territories.
#[allow(clippy::arithmetic_side_effects)]
fn place_starts(
    map: &mut GalaxyMap,
    layout: &MapLayout,
    players: usize,
) -> Result<Vec<TerritoryId>, GalaxyError> {
    let positions: Vec<(TerritoryId, Position)> = map
        .territories()
        .map(|(id, territory)| (*id, territory.position))
        .collect();

    let center = Position {
        x: layout.width / 2.0,
        y: layout.height / 2.0,
    };

    let mut starts: Vec<TerritoryId> = Vec::with_capacity(players);
    if players > 0 {
        // Seed with the territory farthest from the map center; ties keep
        // the lowest id because only strictly greater distances replace.
        let mut seed: Option<(f64, TerritoryId)> = None;
        for &(id, pos) in &positions {
            let d = pos.distance_to(&center);
            if seed.is_none_or(|(best, _)| d > best) {
                seed = Some((d, id));
            }
        }
        let Some((_, first)) = seed else {
            return Err(GalaxyError::EmptyMap);
        };
        starts.push(first);
    }

    while starts.len() < players {
        let mut next: Option<(f64, TerritoryId)> = None;
        for &(id, pos) in &positions {
            if starts.contains(&id) {
                continue;
            }
            let nearest = starts
                .iter()
                .filter_map(|s| positions.iter().find(|(pid, _)| pid == s))
                .map(|(_, spos)| pos.distance_to(spos))
                .fold(f64::INFINITY, f64::min);
            if next.is_none_or(|(best, _)| nearest > best) {
                next = Some((nearest, id));
            }
        }
        let Some((_, id)) = next else {
            return Err(GalaxyError::InsufficientStarts {
                players,
                territories: positions.len(),
            });
        };
        starts.push(id);
    }

    for &id in &starts {
        let territory = map.territory_mut(id)?;
        territory.army_size = layout.base_army;
        territory.colonizable = false;
        territory.capital = layout.capitals;
    }

    Ok(starts)
}
