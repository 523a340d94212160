//! Persistence adapters for scheduled timers.

pub mod memory;
