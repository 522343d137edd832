//! Room clock, tick cycle, and simulation rules for the Starhold
//! conquest engine.
//!
//! This crate owns the authoritative room loop: every tick it drains
//! queued commands, runs autonomous player decisions, advances probes
//! and supply shipments, applies growth, and emits the events and
//! deltas that keep clients in sync.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic room tick counter and cadence checks.
//! - [`config`] -- Configuration loading from `starhold-config.yaml`
//!   into strongly-typed structs.
//! - [`store`] -- The authoritative state store with dirty-set
//!   tracking and the defensive reconciliation sweep.
//! - [`combat`] -- Attack resolution with randomized multipliers.
//! - [`supply`] -- Supply route creation, drain transfers, shipment
//!   movement, and path revalidation.
//! - [`policy`] -- The stateless autonomous player decision policy.
//! - [`command`] -- Command validation and execution pipeline.
//! - [`sync`] -- Full snapshot and delta construction from dirty sets.
//! - [`tick`] -- The single-tick execution sequence.
//! - [`room`] -- Match setup, capital consequences, elimination, and
//!   end-of-match detection.
//! - [`runner`] -- The async loop around [`tick`]: signal draining,
//!   event fan-out, and pacing.

pub mod clock;
pub mod combat;
pub mod command;
pub mod config;
pub mod policy;
pub mod room;
pub mod runner;
pub mod store;
pub mod supply;
pub mod sync;
pub mod tick;
