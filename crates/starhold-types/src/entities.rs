//! Core entity records: territories, players, probes, and supply routes.
//!
//! These are the authoritative state shapes owned by a room's tick loop
//! and the exact shapes broadcast to clients (full snapshots and deltas
//! serialize entities whole, never field-level diffs). All fields use
//! camelCase on the wire.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{PlayerId, ProbeId, TerritoryId};

// ---------------------------------------------------------------------------
// Territories
// ---------------------------------------------------------------------------

/// A point on the 2D map plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate in map units.
    pub x: f64,
    /// Vertical coordinate in map units.
    pub y: f64,
}

impl Position {
    /// Euclidean distance to another position.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// A star-system territory: one node in the ownership graph.
///
/// Territories are created once at match setup and never destroyed.
/// Adjacency is stored directly on the record as a sorted neighbor list,
/// keyed by stable integer ids, so the graph is a flat arena with no
/// embedded references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    /// Stable arena index of this territory.
    pub id: TerritoryId,
    /// Map position, used for rendering and probe travel time.
    pub position: Position,
    /// Owning player, or `None` while neutral.
    pub owner: Option<PlayerId>,
    /// Number of armies garrisoned here.
    pub army_size: u32,
    /// Visual radius in map units.
    pub radius: f64,
    /// Ids of territories reachable over one warp lane, ascending.
    pub neighbors: Vec<TerritoryId>,
    /// Whether a probe may colonize this territory while neutral.
    pub colonizable: bool,
    /// Whether this territory is its owner's capital.
    pub capital: bool,
}

impl Territory {
    /// Whether the territory currently has no owner.
    pub const fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    /// Whether `other` is directly reachable over one warp lane.
    pub fn is_neighbor(&self, other: TerritoryId) -> bool {
        self.neighbors.binary_search(&other).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// How a player's commands are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PlayerKind {
    /// Commands arrive from a connected client.
    Human,
    /// Commands are emitted by the in-process decision policy.
    Autonomous,
}

/// A participant in one match.
///
/// Players are created at room start and retained after elimination
/// (marked, never removed) for end-of-match reporting. The territory set
/// is maintained transactionally by the state store: it is always the
/// exact set of territories whose owner equals this player's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Unique player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color as a `#rrggbb` hex string.
    pub color: String,
    /// Human or autonomous.
    pub kind: PlayerKind,
    /// Ids of every territory this player currently owns.
    pub territories: BTreeSet<TerritoryId>,
    /// Whether the player has been eliminated from the match.
    pub eliminated: bool,
    /// Lobby readiness; the loop starts when every human is ready.
    pub ready: bool,
    /// When the player joined the room.
    pub joined_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// An in-flight colonization probe.
///
/// Created by a launch command; destroyed on arrival (converting a
/// neutral territory into the owner's colony) or on owner elimination.
/// An in-flight probe cannot be cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    /// Monotonic per-room probe identifier.
    pub id: ProbeId,
    /// Territory the probe launched from.
    pub origin: TerritoryId,
    /// Territory the probe is traveling to.
    pub destination: TerritoryId,
    /// Player who launched the probe.
    pub owner: PlayerId,
    /// Travel progress in `0.0..=1.0`, derived from elapsed ticks.
    pub progress: f64,
    /// Tick at which the probe launched.
    pub launch_tick: u64,
    /// Total travel time in ticks.
    pub duration_ticks: u64,
    /// Armies invested at launch; they become the colony garrison.
    pub armies: u32,
}

// ---------------------------------------------------------------------------
// Supply routes
// ---------------------------------------------------------------------------

/// A bundle of armies in transit along a supply route.
///
/// Accounting is applied at each hop's completion: the armies are added
/// to the hop territory on arrival and subtracted again on departure, so
/// in-transit armies always count toward the territory they currently
/// occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    /// Armies still moving with this shipment.
    pub armies: u32,
    /// Index into the route path of the territory the shipment occupies.
    pub position: usize,
    /// Tick at which the shipment completes its next hop.
    pub next_hop_tick: u64,
}

/// A persistent one-way logistics edge between two owned territories.
///
/// At most one active outgoing route exists per origin; creating a new
/// route from the same origin replaces the old one. The cached path was
/// fully owned by the creator at validation time and is re-validated on
/// a fixed interval, never trusted indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SupplyRoute {
    /// Origin territory (the drain source); unique per route.
    pub origin: TerritoryId,
    /// Destination territory.
    pub destination: TerritoryId,
    /// Player who created the route.
    pub owner: PlayerId,
    /// Cached path from origin to destination, inclusive of both.
    pub path: Vec<TerritoryId>,
    /// Whether the route is live; torn-down routes are removed, so this
    /// is `false` only transiently inside a tick.
    pub active: bool,
    /// Tick at which the route was created.
    pub created_tick: u64,
    /// Army bundles currently in transit along the path.
    pub shipments: Vec<Shipment>,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Lifecycle phase of a game room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RoomPhase {
    /// Players are joining and readying up; the loop has not started.
    Lobby,
    /// The tick loop is running.
    Running,
    /// The match ended; the room only serves its final summary.
    Finished,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn make_territory(id: u32) -> Territory {
        Territory {
            id: TerritoryId::new(id),
            position: Position { x: 0.0, y: 0.0 },
            owner: None,
            army_size: 0,
            radius: 20.0,
            neighbors: Vec::new(),
            colonizable: false,
            capital: false,
        }
    }

    #[test]
    fn neighbor_lookup_uses_sorted_list() {
        let mut t = make_territory(1);
        t.neighbors = vec![TerritoryId::new(2), TerritoryId::new(5), TerritoryId::new(9)];
        assert!(t.is_neighbor(TerritoryId::new(5)));
        assert!(!t.is_neighbor(TerritoryId::new(4)));
    }

    #[test]
    fn position_distance_is_euclidean() {
        let a = Position { x: 0.0, y: 0.0 };
        let b = Position { x: 3.0, y: 4.0 };
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn territory_serializes_camel_case() {
        let t = make_territory(3);
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("armySize").is_some());
        assert!(json.get("army_size").is_none());
    }
}
