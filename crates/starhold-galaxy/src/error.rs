//! Error types for the `starhold-galaxy` crate.
//!
//! All fallible operations in this crate return [`GalaxyError`] through
//! the standard [`Result`] type alias.

use starhold_types::TerritoryId;

/// Errors that can occur during galaxy-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GalaxyError {
    /// A territory was not found in the galaxy graph.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// A duplicate territory was inserted where uniqueness is required.
    #[error("duplicate territory id: {0}")]
    DuplicateTerritory(TerritoryId),

    /// A warp lane was added with identical endpoints.
    #[error("warp lane endpoints must differ: {0}")]
    SelfLane(TerritoryId),

    /// A warp lane between these territories already exists.
    #[error("duplicate warp lane between {a} and {b}")]
    DuplicateLane {
        /// One endpoint.
        a: TerritoryId,
        /// The other endpoint.
        b: TerritoryId,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in galaxy calculation")]
    ArithmeticOverflow,

    /// A map was requested with no territories.
    #[error("map must contain at least one territory")]
    EmptyMap,

    /// More starting positions were requested than territories exist.
    #[error("cannot place {players} players on {territories} territories")]
    InsufficientStarts {
        /// Players needing a starting territory.
        players: usize,
        /// Territories available.
        territories: usize,
    },
}
