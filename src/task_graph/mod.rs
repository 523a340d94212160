//! Task graph store for construction projects.
//!
//! The task graph is the authoritative internal record of a project's phases
//! and tasks. Every task status change, whether it originates from a user,
//! from a dispute, or from the external board, passes through a single
//! revision-checked `apply` contract so that out-of-order and duplicate board
//! deliveries converge on the same state. Phase status is derived from task
//! status after each accepted change. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
