//! Port contracts for the external board and mapping persistence.

pub mod board;
pub mod repository;

pub use board::{BoardClient, BoardClientError, BoardClientResult, CardSnapshot};
pub use repository::{CardMappingRepository, CardMappingRepositoryError, CardMappingRepositoryResult};

#[cfg(test)]
pub use board::MockBoardClient;
