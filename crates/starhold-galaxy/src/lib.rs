//! Galaxy topology for the Starhold conquest engine.
//!
//! This crate owns the territory graph and everything derived from it:
//!
//! - [`GalaxyMap`] -- territories and the warp lanes linking them, with
//!   sorted adjacency lists kept in lockstep with the lane set
//! - [`find_path`] -- shortest-path search that switches between BFS and
//!   Dijkstra depending on lane distances, with deterministic tie-breaks
//! - [`builder`] -- seeded synthetic map generation for match setup
//!
//! The map is pure data plus queries. Simulation rules (combat, supply,
//! colonization) live in the core crate and treat this one as read-mostly
//! geometry.

pub mod builder;
pub mod error;
pub mod map;
pub mod path;

pub use builder::{BuiltMap, MapLayout, build_map};
pub use error::GalaxyError;
pub use map::{GalaxyMap, WarpLane};
pub use path::{PathMode, find_path};
