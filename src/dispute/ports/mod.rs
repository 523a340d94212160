//! Port contracts for dispute persistence.

pub mod repository;

pub use repository::{DisputeRepository, DisputeRepositoryError, DisputeRepositoryResult};
