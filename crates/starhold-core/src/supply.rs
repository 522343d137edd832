//! Persistent supply routes: creation, drains, and teardown.
//!
//! A route is a one-way logistics edge with a cached strict path. On the
//! transfer interval the origin drains everything above the minimum
//! garrison into a shipment; shipments then walk the path one hop per
//! `hop_delay_ticks`, with army accounting applied at each hop
//! completion. In-transit armies sit on and count toward the territory
//! of their current hop, so combat and delta sync always see them.
//!
//! Teardown triggers: explicit cancel, loss of ownership along the path
//! (checked at drain time, at each hop, and on the throttled
//! revalidation pass), and capture of the origin or destination by a
//! third party (immediate, via [`handle_capture`]). Revalidation first
//! tries to recompute a replacement path before giving up on a route.

use starhold_galaxy::{PathMode, find_path};
use starhold_types::{CommandRejection, PlayerId, Shipment, SupplyRoute, TerritoryId};
use tracing::debug;

use crate::config::SupplySettings;
use crate::store::{StateStore, StoreError};

/// Create (or replace) the supply route originating at `origin`.
///
/// The caller has already verified that the player owns the origin, the
/// destination is theirs, and the endpoints differ. At most one route
/// may originate at a territory; creating a second replaces the first.
///
/// # Errors
///
/// Returns [`CommandRejection::NoPath`] when no fully-owned path
/// connects the endpoints, or [`CommandRejection::RouteLimitExceeded`]
/// when the player is at their route cap and this is not a replacement.
pub fn create_route(
    store: &mut StateStore,
    settings: &SupplySettings,
    player: PlayerId,
    origin: TerritoryId,
    destination: TerritoryId,
    tick: u64,
) -> Result<(), CommandRejection> {
    let path = find_path(store.map(), origin, destination, PathMode::Strict, |t| {
        t.owner == Some(player)
    })
    .ok_or(CommandRejection::NoPath {
        from: origin,
        to: destination,
    })?;

    let limit = settings.max_routes_per_player;
    if limit > 0 {
        let replacing = store.route(origin).is_some();
        if !replacing && store.route_count_for(player) >= limit {
            return Err(CommandRejection::RouteLimitExceeded { limit });
        }
    }

    let hops = path.len();
    let replaced = store
        .insert_route(SupplyRoute {
            origin,
            destination,
            owner: player,
            path,
            active: true,
            created_tick: tick,
            shipments: Vec::new(),
        })
        .is_some();
    debug!(tick, %origin, %destination, hops, replaced, "Supply route created");
    Ok(())
}

/// Cancel the route originating at `origin`.
///
/// # Errors
///
/// Returns [`CommandRejection::NoSuchRoute`] when nothing originates
/// there, or [`CommandRejection::NotOwner`] when the route belongs to
/// another player.
pub fn cancel_route(
    store: &mut StateStore,
    player: PlayerId,
    origin: TerritoryId,
) -> Result<(), CommandRejection> {
    let route = store
        .route(origin)
        .ok_or(CommandRejection::NoSuchRoute(origin))?;
    if route.owner != player {
        return Err(CommandRejection::NotOwner(origin));
    }
    let _removed = store.remove_route(origin);
    debug!(%origin, "Supply route cancelled");
    Ok(())
}

/// Drain every valid route's origin into a new shipment.
///
/// Runs on the transfer interval. Each route is revalidated first; a
/// route whose path is no longer fully owned is torn down instead of
/// drained. The drained armies stay on the origin until the first hop
/// completes.
///
/// # Errors
///
/// Propagates [`StoreError`] if a path references a vanished territory.
pub fn run_transfers(
    store: &mut StateStore,
    settings: &SupplySettings,
    tick: u64,
) -> Result<(), StoreError> {
    let origins: Vec<TerritoryId> = store.routes().map(|route| route.origin).collect();
    for origin in origins {
        let Some(route) = store.route(origin) else {
            continue;
        };
        let owner = route.owner;
        let path = route.path.clone();

        if !path_owned(store, &path, owner)? {
            let _removed = store.remove_route(origin);
            debug!(tick, %origin, "Supply route torn down: path ownership lost");
            continue;
        }

        let drained = store
            .territory(origin)?
            .army_size
            .saturating_sub(settings.min_garrison);
        if drained == 0 {
            continue;
        }
        if let Some(route) = store.route_mut(origin) {
            route.shipments.push(Shipment {
                armies: drained,
                position: 0,
                next_hop_tick: tick.saturating_add(settings.hop_delay_ticks),
            });
            debug!(tick, %origin, armies = drained, "Supply drain staged");
        }
    }
    Ok(())
}

/// Advance every due shipment by one hop.
///
/// At each hop completion the moved armies are debited from the current
/// territory and credited to the next. The move is clamped to what the
/// current territory can give without dropping below its floor (the
/// route's minimum garrison at the origin, one army elsewhere), so a
/// shipment shrinks if its armies were consumed by combat en route. A
/// shipment whose next hop is no longer owned by the route's creator
/// tears the whole route down; armies stay where they sit.
///
/// # Errors
///
/// Propagates [`StoreError`] if a path references a vanished territory.
pub fn advance_shipments(
    store: &mut StateStore,
    settings: &SupplySettings,
    tick: u64,
) -> Result<(), StoreError> {
    let origins: Vec<TerritoryId> = store.routes().map(|route| route.origin).collect();
    for origin in origins {
        let Some(route) = store.route(origin) else {
            continue;
        };
        if route.shipments.is_empty() {
            continue;
        }
        let owner = route.owner;
        let path = route.path.clone();
        let mut shipments = route.shipments.clone();
        let mut torn_down = false;
        let mut survivors: Vec<Shipment> = Vec::with_capacity(shipments.len());

        for shipment in &mut shipments {
            if torn_down {
                break;
            }
            if tick < shipment.next_hop_tick {
                survivors.push(shipment.clone());
                continue;
            }
            let from_idx = shipment.position;
            let to_idx = from_idx.saturating_add(1);
            let (Some(&from_t), Some(&to_t)) = (path.get(from_idx), path.get(to_idx)) else {
                continue;
            };

            if store.territory(to_t)?.owner != Some(owner) {
                torn_down = true;
                continue;
            }

            let keep = if from_idx == 0 { settings.min_garrison } else { 1 };
            let from_army = store.territory(from_t)?.army_size;
            let moved = shipment.armies.min(from_army.saturating_sub(keep));
            if moved == 0 {
                continue;
            }

            store.set_army(from_t, from_army.saturating_sub(moved))?;
            let _new_total = store.add_army(to_t, moved)?;

            let arrived = to_idx == path.len().saturating_sub(1);
            if arrived {
                debug!(tick, %origin, armies = moved, "Shipment arrived at destination");
                continue;
            }
            shipment.armies = moved;
            shipment.position = to_idx;
            shipment.next_hop_tick = tick.saturating_add(settings.hop_delay_ticks);
            survivors.push(shipment.clone());
        }

        if torn_down {
            let _removed = store.remove_route(origin);
            debug!(tick, %origin, "Supply route torn down: next hop captured");
        } else if let Some(route) = store.route_mut(origin) {
            route.shipments = survivors;
        }
    }
    Ok(())
}

/// Revalidate every cached path, rerouting or tearing down drifted ones.
///
/// Runs on the (coarse) revalidation interval, never every tick. A
/// route whose path is no longer fully owned gets one recomputation
/// attempt; if a replacement strict path exists the route is rerouted
/// (in-flight shipments are absorbed by their current hop territory),
/// otherwise it is torn down.
///
/// # Errors
///
/// Propagates [`StoreError`] if a path references a vanished territory.
pub fn revalidate_routes(
    store: &mut StateStore,
    tick: u64,
) -> Result<(), StoreError> {
    let origins: Vec<TerritoryId> = store.routes().map(|route| route.origin).collect();
    for origin in origins {
        let Some(route) = store.route(origin) else {
            continue;
        };
        let owner = route.owner;
        let destination = route.destination;
        let path = route.path.clone();

        if path_owned(store, &path, owner)? {
            continue;
        }

        // The origin itself is exempt from the path predicate, so check
        // it explicitly before recomputing.
        let origin_lost = store.territory(origin)?.owner != Some(owner);
        let replacement = if origin_lost {
            None
        } else {
            find_path(store.map(), origin, destination, PathMode::Strict, |t| {
                t.owner == Some(owner)
            })
        };

        match replacement {
            Some(new_path) => {
                let hops = new_path.len();
                if let Some(route) = store.route_mut(origin) {
                    route.path = new_path;
                    route.shipments.clear();
                }
                debug!(tick, %origin, %destination, hops, "Supply route rerouted");
            }
            None => {
                let _removed = store.remove_route(origin);
                debug!(tick, %origin, %destination, "Supply route torn down: no replacement path");
            }
        }
    }
    Ok(())
}

/// Tear down routes invalidated by a territory changing hands.
///
/// Covers the immediate triggers: a captured origin and a destination
/// captured by a third party. Mid-path captures are caught by the hop
/// guard and the revalidation pass.
pub fn handle_capture(store: &mut StateStore, territory: TerritoryId, new_owner: Option<PlayerId>) {
    let origins: Vec<TerritoryId> = store
        .routes()
        .filter(|route| {
            (route.origin == territory || route.destination == territory)
                && Some(route.owner) != new_owner
        })
        .map(|route| route.origin)
        .collect();
    for origin in origins {
        let _removed = store.remove_route(origin);
        debug!(%origin, %territory, "Supply route torn down: endpoint captured");
    }
}

/// Tear down every route owned by an eliminated player.
pub fn teardown_for_player(store: &mut StateStore, player: PlayerId) {
    let origins: Vec<TerritoryId> = store
        .routes()
        .filter(|route| route.owner == player)
        .map(|route| route.origin)
        .collect();
    for origin in origins {
        let _removed = store.remove_route(origin);
    }
}

/// Whether every territory on a path is owned by the given player.
fn path_owned(
    store: &StateStore,
    path: &[TerritoryId],
    owner: PlayerId,
) -> Result<bool, StoreError> {
    for &id in path {
        if store.territory(id)?.owner != Some(owner) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::Utc;
    use starhold_galaxy::GalaxyMap;
    use starhold_types::{Player, PlayerKind, Position, Territory};

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
            colonizable: false,
            capital: false,
        }
    }

    fn make_player(name: &str) -> Player {
        Player {
            id: PlayerId::new(),
            name: name.to_owned(),
            color: "#0000ff".to_owned(),
            kind: PlayerKind::Human,
            territories: std::collections::BTreeSet::new(),
            eliminated: false,
            ready: true,
            joined_at: Utc::now(),
        }
    }

    /// A chain 0-1-2-...-(n-1) fully owned by a fresh player.
    fn make_chain_store(n: u32) -> (StateStore, PlayerId) {
        let mut map = GalaxyMap::new();
        for id in 0..n {
            map.add_territory(make_territory(id)).unwrap();
        }
        for id in 1..n {
            map.add_lane(TerritoryId::new(id - 1), TerritoryId::new(id), 1)
                .unwrap();
        }
        let mut store = StateStore::new(map);
        let player = make_player("P1");
        let id = player.id;
        store.add_player(player).unwrap();
        for t in 0..n {
            store.set_owner(TerritoryId::new(t), Some(id)).unwrap();
        }
        (store, id)
    }

    fn settings() -> SupplySettings {
        SupplySettings {
            transfer_interval_ticks: 20,
            revalidate_interval_ticks: 10,
            min_garrison: 5,
            hop_delay_ticks: 2,
            max_routes_per_player: 8,
        }
    }

    fn total_armies(store: &StateStore) -> u64 {
        store
            .map()
            .territories()
            .map(|(_, t)| u64::from(t.army_size))
            .sum()
    }

    #[test]
    fn second_route_from_same_origin_replaces_the_first() {
        let (mut store, player) = make_chain_store(4);
        let s = settings();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(2), 1).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 2).unwrap();

        assert_eq!(store.routes().count(), 1);
        let route = store.route(TerritoryId::new(0)).unwrap();
        assert_eq!(route.destination, TerritoryId::new(3));
        assert_eq!(route.created_tick, 2);
    }

    #[test]
    fn create_requires_a_fully_owned_path() {
        let (mut store, player) = make_chain_store(4);
        let enemy = make_player("P2");
        let enemy_id = enemy.id;
        store.add_player(enemy).unwrap();
        store.set_owner(TerritoryId::new(1), Some(enemy_id)).unwrap();

        let result = create_route(
            &mut store,
            &settings(),
            player,
            TerritoryId::new(0),
            TerritoryId::new(3),
            1,
        );
        assert!(matches!(result, Err(CommandRejection::NoPath { .. })));
    }

    #[test]
    fn route_cap_blocks_new_origins_but_not_replacements() {
        let (mut store, player) = make_chain_store(4);
        let mut s = settings();
        s.max_routes_per_player = 1;

        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(2), 1).unwrap();
        let blocked = create_route(&mut store, &s, player, TerritoryId::new(1), TerritoryId::new(3), 2);
        assert!(matches!(
            blocked,
            Err(CommandRejection::RouteLimitExceeded { limit: 1 })
        ));

        // Replacing the existing origin stays within the cap.
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 3).unwrap();
        assert_eq!(store.routes().count(), 1);
    }

    #[test]
    fn cancel_checks_existence_and_ownership() {
        let (mut store, player) = make_chain_store(4);
        let stranger = make_player("P2");
        let stranger_id = stranger.id;
        store.add_player(stranger).unwrap();

        assert!(matches!(
            cancel_route(&mut store, player, TerritoryId::new(0)),
            Err(CommandRejection::NoSuchRoute(_))
        ));

        create_route(&mut store, &settings(), player, TerritoryId::new(0), TerritoryId::new(3), 1)
            .unwrap();
        assert!(matches!(
            cancel_route(&mut store, stranger_id, TerritoryId::new(0)),
            Err(CommandRejection::NotOwner(_))
        ));

        cancel_route(&mut store, player, TerritoryId::new(0)).unwrap();
        assert!(store.route(TerritoryId::new(0)).is_none());
    }

    #[test]
    fn drain_walks_the_chain_hop_by_hop() {
        let (mut store, player) = make_chain_store(4);
        let s = settings();
        store.set_army(TerritoryId::new(0), 30).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 1).unwrap();
        let before = total_armies(&store);

        run_transfers(&mut store, &s, 20).unwrap();
        // Drained armies still sit on the origin until the first hop.
        assert_eq!(store.territory(TerritoryId::new(0)).unwrap().army_size, 30);

        for tick in 21..=26 {
            advance_shipments(&mut store, &s, tick).unwrap();
            assert_eq!(total_armies(&store), before, "armies lost at tick {tick}");
            assert!(
                store.territory(TerritoryId::new(0)).unwrap().army_size >= s.min_garrison,
                "origin below minimum garrison at tick {tick}"
            );
        }

        // 25 armies moved 0 -> 1 -> 2 -> 3 across three hop delays.
        assert_eq!(store.territory(TerritoryId::new(0)).unwrap().army_size, 5);
        assert_eq!(store.territory(TerritoryId::new(1)).unwrap().army_size, 2);
        assert_eq!(store.territory(TerritoryId::new(2)).unwrap().army_size, 2);
        assert_eq!(store.territory(TerritoryId::new(3)).unwrap().army_size, 27);
        assert!(store.route(TerritoryId::new(0)).unwrap().shipments.is_empty());
    }

    #[test]
    fn in_transit_armies_count_toward_their_hop_territory() {
        let (mut store, player) = make_chain_store(4);
        let s = settings();
        store.set_army(TerritoryId::new(0), 30).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 1).unwrap();

        run_transfers(&mut store, &s, 20).unwrap();
        advance_shipments(&mut store, &s, 22).unwrap();

        // After the first hop the 25 drained armies sit on territory 1.
        assert_eq!(store.territory(TerritoryId::new(0)).unwrap().army_size, 5);
        assert_eq!(store.territory(TerritoryId::new(1)).unwrap().army_size, 27);
        let route = store.route(TerritoryId::new(0)).unwrap();
        assert_eq!(route.shipments.len(), 1);
        assert_eq!(route.shipments.first().unwrap().position, 1);
    }

    #[test]
    fn drain_skips_origins_at_the_garrison_floor() {
        let (mut store, player) = make_chain_store(3);
        let s = settings();
        store.set_army(TerritoryId::new(0), 5).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(2), 1).unwrap();

        run_transfers(&mut store, &s, 20).unwrap();
        assert!(store.route(TerritoryId::new(0)).unwrap().shipments.is_empty());
        assert_eq!(store.territory(TerritoryId::new(0)).unwrap().army_size, 5);
    }

    #[test]
    fn transfer_time_revalidation_tears_down_lost_paths() {
        let (mut store, player) = make_chain_store(4);
        let s = settings();
        let enemy = make_player("P2");
        let enemy_id = enemy.id;
        store.add_player(enemy).unwrap();
        store.set_army(TerritoryId::new(0), 30).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 1).unwrap();

        store.set_owner(TerritoryId::new(2), Some(enemy_id)).unwrap();
        run_transfers(&mut store, &s, 20).unwrap();

        assert!(store.route(TerritoryId::new(0)).is_none());
        assert_eq!(store.territory(TerritoryId::new(0)).unwrap().army_size, 30);
    }

    #[test]
    fn hop_guard_stops_shipments_entering_enemy_territory() {
        let (mut store, player) = make_chain_store(4);
        let s = settings();
        let enemy = make_player("P2");
        let enemy_id = enemy.id;
        store.add_player(enemy).unwrap();
        store.set_army(TerritoryId::new(0), 30).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(3), 1).unwrap();
        let before = total_armies(&store);

        run_transfers(&mut store, &s, 20).unwrap();
        advance_shipments(&mut store, &s, 22).unwrap();
        // Shipment now sits on territory 1; the next hop gets captured.
        store.set_owner(TerritoryId::new(2), Some(enemy_id)).unwrap();
        advance_shipments(&mut store, &s, 24).unwrap();

        assert!(store.route(TerritoryId::new(0)).is_none());
        // The in-transit armies are absorbed where they stood.
        assert_eq!(store.territory(TerritoryId::new(1)).unwrap().army_size, 27);
        assert_eq!(total_armies(&store), before);
    }

    #[test]
    fn revalidation_reroutes_around_a_lost_hop() {
        // Diamond: 0-1-3 and 0-2-3.
        let mut map = GalaxyMap::new();
        for id in 0..4 {
            map.add_territory(make_territory(id)).unwrap();
        }
        map.add_lane(TerritoryId::new(0), TerritoryId::new(1), 1).unwrap();
        map.add_lane(TerritoryId::new(1), TerritoryId::new(3), 1).unwrap();
        map.add_lane(TerritoryId::new(0), TerritoryId::new(2), 1).unwrap();
        map.add_lane(TerritoryId::new(2), TerritoryId::new(3), 1).unwrap();
        let mut store = StateStore::new(map);
        let player = make_player("P1");
        let enemy = make_player("P2");
        let (id, enemy_id) = (player.id, enemy.id);
        store.add_player(player).unwrap();
        store.add_player(enemy).unwrap();
        for t in 0..4 {
            store.set_owner(TerritoryId::new(t), Some(id)).unwrap();
        }
        let s = settings();
        create_route(&mut store, &s, id, TerritoryId::new(0), TerritoryId::new(3), 1).unwrap();
        assert_eq!(
            store.route(TerritoryId::new(0)).unwrap().path,
            vec![TerritoryId::new(0), TerritoryId::new(1), TerritoryId::new(3)]
        );

        store.set_owner(TerritoryId::new(1), Some(enemy_id)).unwrap();
        revalidate_routes(&mut store, 10).unwrap();

        let route = store.route(TerritoryId::new(0)).unwrap();
        assert_eq!(
            route.path,
            vec![TerritoryId::new(0), TerritoryId::new(2), TerritoryId::new(3)]
        );
    }

    #[test]
    fn revalidation_tears_down_unreachable_routes() {
        let (mut store, player) = make_chain_store(4);
        let enemy = make_player("P2");
        let enemy_id = enemy.id;
        store.add_player(enemy).unwrap();
        create_route(&mut store, &settings(), player, TerritoryId::new(0), TerritoryId::new(3), 1)
            .unwrap();

        store.set_owner(TerritoryId::new(2), Some(enemy_id)).unwrap();
        revalidate_routes(&mut store, 10).unwrap();
        assert!(store.route(TerritoryId::new(0)).is_none());
    }

    #[test]
    fn endpoint_capture_tears_down_foreign_routes() {
        let (mut store, player) = make_chain_store(4);
        let enemy = make_player("P2");
        let enemy_id = enemy.id;
        store.add_player(enemy).unwrap();
        create_route(&mut store, &settings(), player, TerritoryId::new(0), TerritoryId::new(3), 1)
            .unwrap();

        handle_capture(&mut store, TerritoryId::new(3), Some(enemy_id));
        assert!(store.route(TerritoryId::new(0)).is_none());
        assert!(store
            .dirty()
            .removed_routes
            .contains(&TerritoryId::new(0)));
    }

    #[test]
    fn elimination_removes_all_player_routes() {
        let (mut store, player) = make_chain_store(5);
        let s = settings();
        create_route(&mut store, &s, player, TerritoryId::new(0), TerritoryId::new(2), 1).unwrap();
        create_route(&mut store, &s, player, TerritoryId::new(1), TerritoryId::new(4), 1).unwrap();
        assert_eq!(store.routes().count(), 2);

        teardown_for_player(&mut store, player);
        assert_eq!(store.routes().count(), 0);
    }
}
