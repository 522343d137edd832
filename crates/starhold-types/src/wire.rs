//! Outbound wire messages: snapshots, deltas, combat results, and
//! match summaries.
//!
//! Everything a client can receive is one [`RoomEvent`], tagged with a
//! `type` field. Deltas carry whole entity records for changed entities
//! only (never field-level diffs) plus removal lists, so replaying the
//! delta stream onto a full snapshot reproduces the authoritative state
//! exactly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::command::CommandKind;
use crate::entities::{Player, Probe, SupplyRoute, Territory};
use crate::ids::{PlayerId, ProbeId, TerritoryId};
use crate::rejection::RejectionClass;

// ---------------------------------------------------------------------------
// State synchronization
// ---------------------------------------------------------------------------

/// Complete room state, sent once when the loop starts and to every
/// subscriber on attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshot {
    /// Tick the snapshot was taken at.
    pub tick: u64,
    /// Every territory, keyed by id.
    pub territories: BTreeMap<TerritoryId, Territory>,
    /// Every player, keyed by id.
    pub players: BTreeMap<PlayerId, Player>,
    /// Every in-flight probe.
    pub probes: Vec<Probe>,
    /// Every active supply route.
    pub supply_routes: Vec<SupplyRoute>,
    /// Server time the snapshot was serialized.
    pub timestamp: DateTime<Utc>,
}

/// The set of entities mutated since the previous successful broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct DeltaState {
    /// Tick the delta was taken at; strictly monotonic per room.
    pub tick: u64,
    /// Changed territories, keyed by id.
    pub territories: BTreeMap<TerritoryId, Territory>,
    /// Changed players, keyed by id.
    pub players: BTreeMap<PlayerId, Player>,
    /// Changed (created or advanced) probes.
    pub probes: Vec<Probe>,
    /// Changed (created or drained) supply routes.
    pub supply_routes: Vec<SupplyRoute>,
    /// Probes destroyed since the last broadcast.
    pub removed_probes: Vec<ProbeId>,
    /// Supply routes torn down since the last broadcast, by origin.
    pub removed_routes: Vec<TerritoryId>,
    /// Server time the delta was serialized.
    pub timestamp: DateTime<Utc>,
}

impl DeltaState {
    /// Whether the delta carries no entity changes at all.
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
            && self.players.is_empty()
            && self.probes.is_empty()
            && self.supply_routes.is_empty()
            && self.removed_probes.is_empty()
            && self.removed_routes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Combat results
// ---------------------------------------------------------------------------

/// Who held the contested territory after an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CombatOutcome {
    /// The attacker captured the territory.
    AttackerWon,
    /// The defender kept the territory.
    DefenderHeld,
}

/// Armies lost on each side of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Casualties {
    /// Attacking armies destroyed.
    pub attacker: u32,
    /// Defending armies destroyed.
    pub defender: u32,
}

/// A resolved attack, broadcast immediately rather than waiting for the
/// periodic delta cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CombatBroadcast {
    /// The attacking player.
    pub attacker_id: PlayerId,
    /// The defending player, or `None` when the territory was neutral.
    pub defender_id: Option<PlayerId>,
    /// The contested territory.
    pub territory_id: TerritoryId,
    /// Who held the territory afterwards.
    pub outcome: CombatOutcome,
    /// Armies destroyed on each side.
    pub casualties: Casualties,
    /// Server time of resolution.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Rejections and match end
// ---------------------------------------------------------------------------

/// A rejected command, delivered only to its originating player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct RejectionNotice {
    /// The player whose command was rejected.
    pub player_id: PlayerId,
    /// The command kind that was rejected.
    pub command: CommandKind,
    /// Human-readable rejection reason.
    pub reason: String,
    /// Broad rejection class.
    pub class: RejectionClass,
    /// Server time of rejection.
    pub timestamp: DateTime<Utc>,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EndReason {
    /// At most one non-eliminated player remained.
    LastPlayerStanding,
    /// The configured tick limit was reached; the territory leader wins.
    MaxTicksReached,
    /// The room was stopped externally.
    Stopped,
}

/// End-of-match report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    /// The winning player, or `None` when nobody survived.
    pub winner_id: Option<PlayerId>,
    /// The tick the match ended at.
    pub final_tick: u64,
    /// Why the match ended.
    pub reason: EndReason,
    /// Server time of match end.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Room event envelope
// ---------------------------------------------------------------------------

/// Every message a room can push to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomEvent {
    /// Complete state, sent at loop start and on attach.
    FullState(FullSnapshot),
    /// Changed entities since the previous broadcast.
    DeltaState(DeltaState),
    /// An attack resolved; bypasses the periodic cadence.
    CombatResult(CombatBroadcast),
    /// A command was rejected; visible only to its originator.
    CommandRejected(RejectionNotice),
    /// The match ended.
    MatchEnded(MatchSummary),
}

impl RoomEvent {
    /// Whether this event may be forwarded to the given viewer.
    ///
    /// Rejections are private to the player who issued the command;
    /// everything else is visible to the whole room.
    pub fn visible_to(&self, viewer: PlayerId) -> bool {
        match self {
            Self::CommandRejected(notice) => notice.player_id == viewer,
            _ => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_delta(tick: u64) -> DeltaState {
        DeltaState {
            tick,
            territories: BTreeMap::new(),
            players: BTreeMap::new(),
            probes: Vec::new(),
            supply_routes: Vec::new(),
            removed_probes: Vec::new(),
            removed_routes: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn delta_event_carries_screaming_type_tag() {
        let event = RoomEvent::DeltaState(make_delta(7));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("DELTA_STATE"));
        assert_eq!(json.get("tick").and_then(serde_json::Value::as_u64), Some(7));
    }

    #[test]
    fn empty_delta_reports_empty() {
        let mut delta = make_delta(1);
        assert!(delta.is_empty());
        delta.removed_probes.push(ProbeId::new(4));
        assert!(!delta.is_empty());
    }

    #[test]
    fn rejections_are_private_to_their_player() {
        let me = PlayerId::new();
        let other = PlayerId::new();
        let event = RoomEvent::CommandRejected(RejectionNotice {
            player_id: me,
            command: CommandKind::AttackTerritory,
            reason: "not adjacent".to_owned(),
            class: RejectionClass::Precondition,
            timestamp: Utc::now(),
        });
        assert!(event.visible_to(me));
        assert!(!event.visible_to(other));

        let public = RoomEvent::DeltaState(make_delta(2));
        assert!(public.visible_to(other));
    }

    #[test]
    fn match_summary_roundtrips() {
        let summary = MatchSummary {
            winner_id: Some(PlayerId::new()),
            final_tick: 900,
            reason: EndReason::LastPlayerStanding,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: MatchSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
