//! Adapters for the board and mapping persistence.

pub mod memory;
