//! Command rejection taxonomy.
//!
//! Every failed command maps to exactly one [`CommandRejection`] variant.
//! Rejections are local to one command: they are returned to the
//! processor, forwarded only to the originating player, and never abort
//! the tick loop. Opponents observe no state change and learn nothing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{PlayerId, TerritoryId};

/// Broad class of a rejection, for metrics and client handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RejectionClass {
    /// The command itself was malformed.
    Validation,
    /// The command was well-formed but its preconditions do not hold.
    Precondition,
    /// A referenced entity does not exist.
    NotFound,
    /// A path existed when the client issued the command but was
    /// invalidated by an ownership change before application.
    TransientPath,
}

/// Why a command was rejected.
///
/// The `Display` strings double as the wire `reason` field, so clients
/// can show them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CommandRejection {
    /// The command could not be interpreted.
    #[error("malformed command: {detail}")]
    Malformed {
        /// What was wrong with the command shape.
        detail: String,
    },

    /// The submitting player is not part of this room.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// A referenced territory id is outside the map.
    #[error("unknown territory {0}")]
    UnknownTerritory(TerritoryId),

    /// No supply route originates at the given territory.
    #[error("no supply route from territory {0}")]
    NoSuchRoute(TerritoryId),

    /// Eliminated players may not act.
    #[error("player has been eliminated")]
    PlayerEliminated,

    /// The player does not own the source territory.
    #[error("not the owner of territory {0}")]
    NotOwner(TerritoryId),

    /// The destination must be owned by the player for this command.
    #[error("destination territory {0} is not yours")]
    DestinationNotOwned(TerritoryId),

    /// Source and target are the same territory.
    #[error("source and target are the same territory")]
    SelfTarget,

    /// The target already belongs to the player.
    #[error("target territory {0} is already yours")]
    TargetIsOwn(TerritoryId),

    /// The destination is neutral where an owned territory is required.
    #[error("territory {0} is neutral")]
    NeutralTarget(TerritoryId),

    /// The territories do not share a warp lane.
    #[error("not adjacent: territory {from} does not border territory {to}")]
    NotAdjacent {
        /// Source territory.
        from: TerritoryId,
        /// Target territory.
        to: TerritoryId,
    },

    /// Too few armies to cover the command's cost and the garrison floor.
    #[error("insufficient armies: have {have}, need {need}")]
    InsufficientArmies {
        /// Armies present at the source.
        have: u32,
        /// Minimum armies required.
        need: u32,
    },

    /// No qualifying path connects the territories.
    #[error("no path from territory {from} to territory {to}")]
    NoPath {
        /// Source territory.
        from: TerritoryId,
        /// Target territory.
        to: TerritoryId,
    },

    /// The target territory does not accept probes.
    #[error("territory {0} cannot be colonized")]
    NotColonizable(TerritoryId),

    /// The probe target has been claimed by a player.
    #[error("territory {0} is already claimed")]
    TargetOccupied(TerritoryId),

    /// The player already runs the maximum number of supply routes.
    #[error("route limit exceeded: at most {limit} active routes")]
    RouteLimitExceeded {
        /// Configured per-player route cap.
        limit: u32,
    },

    /// The path the client saw was invalidated by an ownership change;
    /// recomputation found no replacement.
    #[error(
        "path from territory {from} to territory {to} was invalidated by a recent ownership change"
    )]
    TransientPath {
        /// Source territory.
        from: TerritoryId,
        /// Target territory.
        to: TerritoryId,
    },
}

impl CommandRejection {
    /// The broad class this rejection belongs to.
    pub const fn class(&self) -> RejectionClass {
        match self {
            Self::Malformed { .. } => RejectionClass::Validation,
            Self::UnknownPlayer(_) | Self::UnknownTerritory(_) | Self::NoSuchRoute(_) => {
                RejectionClass::NotFound
            }
            Self::TransientPath { .. } => RejectionClass::TransientPath,
            _ => RejectionClass::Precondition,
        }
    }
}
