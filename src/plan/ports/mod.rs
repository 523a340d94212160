//! Port contract for plan generation.

mod generator;

pub use generator::{PlanGenerator, PlanGeneratorError};
