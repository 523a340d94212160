//! Step definitions for project coordination scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
