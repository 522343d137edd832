//! Shared type definitions for the Starhold conquest engine.
//!
//! This crate is the single source of truth for all types used across the
//! Starhold workspace. Wire-visible types flow downstream to `TypeScript`
//! via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers (UUID and arena-index backed)
//! - [`entities`] -- Core entity records (territories, players, probes, routes)
//! - [`command`] -- Inbound command envelope and kinds
//! - [`rejection`] -- Command rejection taxonomy
//! - [`wire`] -- Outbound messages (snapshots, deltas, combat, summaries)

pub mod command;
pub mod entities;
pub mod ids;
pub mod rejection;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use command::{Command, CommandKind, CommandPayload, QueuedCommand};
pub use entities::{
    Player, PlayerKind, Position, Probe, RoomPhase, Shipment, SupplyRoute, Territory,
};
pub use ids::{PlayerId, ProbeId, RoomId, TerritoryId};
pub use rejection::{CommandRejection, RejectionClass};
pub use wire::{
    Casualties, CombatBroadcast, CombatOutcome, DeltaState, EndReason, FullSnapshot, MatchSummary,
    RejectionNotice, RoomEvent,
};
