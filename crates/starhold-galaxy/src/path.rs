//! Shortest-path queries under a pluggable traversability predicate.
//!
//! [`find_path`] answers every pathfinding question in the engine:
//! supply-route validation and multi-hop reinforcement use
//! [`PathMode::Strict`] (every node after the start must satisfy the
//! predicate, destination included), attack-path previews use
//! [`PathMode::PermissiveLastHop`] (only the destination may fail it,
//! since an attack target is by definition not owned by the attacker).
//!
//! Maps with uniform lane distances take a breadth-first branch that
//! minimizes hop count; otherwise a Dijkstra branch minimizes total lane
//! distance. Both expand neighbors in ascending territory-id order, so
//! ties resolve deterministically toward lower ids. Traversal reads a
//! point-in-time snapshot of the neighbor lists and never mutates the
//! graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use starhold_types::{Territory, TerritoryId};

use crate::map::GalaxyMap;

/// How the traversability predicate applies along a candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Every node after the start must satisfy the predicate, the
    /// destination included.
    Strict,
    /// Every intermediate node must satisfy the predicate; the
    /// destination is exempt.
    PermissiveLastHop,
}

/// Find the shortest path from `start` to `goal`.
///
/// Returns the ordered territory ids from `start` to `goal` inclusive,
/// or `None` when no qualifying path exists. The start node is never
/// tested against the predicate (the caller already stands there).
/// `start == goal` yields the single-node path.
pub fn find_path(
    map: &GalaxyMap,
    start: TerritoryId,
    goal: TerritoryId,
    mode: PathMode,
    passable: impl Fn(&Territory) -> bool,
) -> Option<Vec<TerritoryId>> {
    if start == goal {
        return map.contains(start).then(|| vec![start]);
    }
    if !map.contains(start) || !map.contains(goal) {
        return None;
    }

    let enterable = |id: TerritoryId, territory: &Territory| -> bool {
        if id == goal && mode == PathMode::PermissiveLastHop {
            return true;
        }
        passable(territory)
    };

    let prev = if map.uniform_lane_distances() {
        breadth_first(map, start, goal, &enterable)
    } else {
        dijkstra(map, start, goal, &enterable)
    };

    reconstruct(&prev, start, goal)
}

/// Minimum-hop search for uniform lane distances.
fn breadth_first(
    map: &GalaxyMap,
    start: TerritoryId,
    goal: TerritoryId,
    enterable: &dyn Fn(TerritoryId, &Territory) -> bool,
) -> BTreeMap<TerritoryId, TerritoryId> {
    let mut prev: BTreeMap<TerritoryId, TerritoryId> = BTreeMap::new();
    let mut visited: BTreeSet<TerritoryId> = BTreeSet::new();
    let mut queue: VecDeque<TerritoryId> = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            break;
        }
        // Neighbor lists are sorted ascending, so equal-hop ties fall to
        // the lowest territory id.
        for &neighbor in map.neighbors(current) {
            if visited.contains(&neighbor) {
                continue;
            }
            let Some(territory) = map.get(neighbor) else {
                continue;
            };
            if !enterable(neighbor, territory) {
                continue;
            }
            visited.insert(neighbor);
            prev.insert(neighbor, current);
            queue.push_back(neighbor);
        }
    }

    prev
}

/// Minimum-distance search for weighted lanes.
///
/// Uses a `BTreeSet<(distance, id)>` as a priority queue; the tuple
/// ordering breaks equal-distance ties by ascending territory id.
fn dijkstra(
    map: &GalaxyMap,
    start: TerritoryId,
    goal: TerritoryId,
    enterable: &dyn Fn(TerritoryId, &Territory) -> bool,
) -> BTreeMap<TerritoryId, TerritoryId> {
    let mut dist: BTreeMap<TerritoryId, u32> = BTreeMap::new();
    let mut prev: BTreeMap<TerritoryId, TerritoryId> = BTreeMap::new();
    let mut queue: BTreeSet<(u32, TerritoryId)> = BTreeSet::new();

    dist.insert(start, 0);
    queue.insert((0, start));

    while let Some(&(current_dist, current)) = queue.iter().next() {
        queue.remove(&(current_dist, current));

        if current == goal {
            break;
        }

        for &neighbor in map.neighbors(current) {
            let Some(territory) = map.get(neighbor) else {
                continue;
            };
            if !enterable(neighbor, territory) {
                continue;
            }
            let Some(cost) = map.lane_distance(current, neighbor) else {
                continue;
            };
            let Some(new_dist) = current_dist.checked_add(cost) else {
                continue;
            };

            let is_shorter = dist
                .get(&neighbor)
                .is_none_or(|&existing| new_dist < existing);

            if is_shorter {
                // Remove the stale queue entry if present.
                if let Some(&old_dist) = dist.get(&neighbor) {
                    queue.remove(&(old_dist, neighbor));
                }
                dist.insert(neighbor, new_dist);
                prev.insert(neighbor, current);
                queue.insert((new_dist, neighbor));
            }
        }
    }

    prev
}

/// Walk the predecessor map back from `goal` to `start`.
fn reconstruct(
    prev: &BTreeMap<TerritoryId, TerritoryId>,
    start: TerritoryId,
    goal: TerritoryId,
) -> Option<Vec<TerritoryId>> {
    if !prev.contains_key(&goal) {
        return None;
    }

    let mut path = VecDeque::new();
    let mut current = goal;
    path.push_front(current);
    while let Some(&predecessor) = prev.get(&current) {
        path.push_front(predecessor);
        current = predecessor;
        if current == start {
            break;
        }
    }

    Some(path.into_iter().collect())
}
