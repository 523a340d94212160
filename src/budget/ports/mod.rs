//! Port contracts for budget persistence.

pub mod repository;

pub use repository::{BudgetRepository, BudgetRepositoryError, BudgetRepositoryResult};
