//! Persistence adapters for the task graph.
//!
//! Persistence technology is left to the embedding application; the
//! in-memory adapter backs tests and single-process deployments.

pub mod memory;
