//! Inbound command types for client-to-engine communication.
//!
//! A [`Command`] is the single wire shape clients submit: a kind, a
//! from/to territory pair, and a client timestamp. Commands queue in
//! arrival order and are drained at tick boundaries, so validation
//! always runs against the state current at execution time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{PlayerId, TerritoryId};

/// The action a command requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Commit all armies above the garrison floor against an adjacent
    /// enemy or neutral territory.
    AttackTerritory,
    /// Move all armies above the garrison floor to another owned
    /// territory along a fully-owned path.
    TransferArmies,
    /// Launch a colonization probe at an adjacent neutral territory.
    LaunchProbe,
    /// Create (or replace) the outgoing supply route from a territory.
    CreateSupplyRoute,
    /// Cancel the outgoing supply route from a territory.
    CancelSupplyRoute,
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::AttackTerritory => "ATTACK_TERRITORY",
            Self::TransferArmies => "TRANSFER_ARMIES",
            Self::LaunchProbe => "LAUNCH_PROBE",
            Self::CreateSupplyRoute => "CREATE_SUPPLY_ROUTE",
            Self::CancelSupplyRoute => "CANCEL_SUPPLY_ROUTE",
        };
        write!(f, "{name}")
    }
}

/// The territory pair a command operates on.
///
/// Every command kind reads `from` as the acting player's territory.
/// `CANCEL_SUPPLY_ROUTE` identifies the route by its origin and ignores
/// `to` (clients send the route destination by convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    /// Source territory id.
    pub from_territory_id: TerritoryId,
    /// Target territory id.
    pub to_territory_id: TerritoryId,
}

/// A command as submitted by a client or the decision policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// What the command does.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// The territory pair it operates on.
    pub payload: CommandPayload,
    /// Client-side submission time; informational only, never used for
    /// ordering (arrival order is authoritative).
    pub timestamp: DateTime<Utc>,
}

impl Command {
    /// Build a command stamped with the current time.
    pub fn new(kind: CommandKind, from: TerritoryId, to: TerritoryId) -> Self {
        Self {
            kind,
            payload: CommandPayload {
                from_territory_id: from,
                to_territory_id: to,
            },
            timestamp: Utc::now(),
        }
    }
}

/// A command tagged with its submitting player, as buffered in the
/// room's FIFO queue between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    /// The player the command belongs to.
    pub player_id: PlayerId,
    /// The command itself.
    pub command: Command,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn command_kind_wire_names_are_screaming_snake() {
        let json = serde_json::to_string(&CommandKind::AttackTerritory).unwrap();
        assert_eq!(json, r#""ATTACK_TERRITORY""#);
        let back: CommandKind = serde_json::from_str(r#""CREATE_SUPPLY_ROUTE""#).unwrap();
        assert_eq!(back, CommandKind::CreateSupplyRoute);
    }

    #[test]
    fn command_serializes_type_tag_and_camel_case_payload() {
        let cmd = Command::new(
            CommandKind::LaunchProbe,
            TerritoryId::new(1),
            TerritoryId::new(2),
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("LAUNCH_PROBE"));
        let payload = json.get("payload").unwrap();
        assert_eq!(
            payload.get("fromTerritoryId").and_then(serde_json::Value::as_u64),
            Some(1)
        );
        assert_eq!(
            payload.get("toTerritoryId").and_then(serde_json::Value::as_u64),
            Some(2)
        );
    }

    #[test]
    fn command_roundtrips_through_json() {
        let cmd = Command::new(
            CommandKind::AttackTerritory,
            TerritoryId::new(5),
            TerritoryId::new(6),
        );
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
