//! Snapshot and delta construction for state synchronization.
//!
//! Deltas carry whole entity records for everything in the store's
//! dirty sets plus removal lists, never field-level diffs. The caller
//! owns the clear: dirty sets are wiped only after a successful send,
//! so a failed broadcast leaves them intact and the next delta carries
//! the accumulated changes (at-least-once per boundary).

use chrono::Utc;
use starhold_types::{DeltaState, FullSnapshot};

use crate::store::StateStore;

/// Serialize the complete room state at a tick.
///
/// Sent when the loop starts and to every subscriber on attach.
#[must_use]
pub fn full_snapshot(store: &StateStore, tick: u64) -> FullSnapshot {
    FullSnapshot {
        tick,
        territories: store
            .map()
            .territories()
            .map(|(id, territory)| (*id, territory.clone()))
            .collect(),
        players: store
            .players()
            .map(|player| (player.id, player.clone()))
            .collect(),
        probes: store.probes().cloned().collect(),
        supply_routes: store.routes().cloned().collect(),
        timestamp: Utc::now(),
    }
}

/// Build the delta for everything dirty since the last successful
/// broadcast, or `None` when nothing changed.
#[must_use]
pub fn build_delta(store: &StateStore, tick: u64) -> Option<DeltaState> {
    let dirty = store.dirty();
    if dirty.is_empty() {
        return None;
    }

    Some(DeltaState {
        tick,
        territories: dirty
            .territories
            .iter()
            .filter_map(|id| store.map().get(*id).map(|t| (*id, t.clone())))
            .collect(),
        players: dirty
            .players
            .iter()
            .filter_map(|id| store.player(*id).ok().map(|p| (*id, p.clone())))
            .collect(),
        probes: dirty
            .probes
            .iter()
            .filter_map(|id| store.probe(*id).ok().cloned())
            .collect(),
        supply_routes: dirty
            .routes
            .iter()
            .filter_map(|origin| store.route(*origin).cloned())
            .collect(),
        removed_probes: dirty.removed_probes.iter().copied().collect(),
        removed_routes: dirty.removed_routes.iter().copied().collect(),
        timestamp: Utc::now(),
    })
}
