//! Port contracts for the task graph.
//!
//! Ports define infrastructure-agnostic interfaces used by task graph
//! services.

pub mod repository;

pub use repository::{
    TaskGraphRepository, TaskGraphRepositoryError, TaskGraphRepositoryResult,
};
