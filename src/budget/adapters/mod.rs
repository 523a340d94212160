//! Persistence adapters for budgets.

pub mod memory;
