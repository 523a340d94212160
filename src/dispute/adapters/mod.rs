//! Persistence adapters for disputes.

pub mod memory;
