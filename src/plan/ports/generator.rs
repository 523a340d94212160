//! Plan generator port.

use crate::plan::domain::PlanProposal;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by plan generators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanGeneratorError {
    /// The description is empty after trimming.
    #[error("project description must not be empty")]
    EmptyDescription,

    /// The estimate overflowed the representable money range.
    #[error("cost estimate out of range")]
    EstimateOutOfRange,

    /// The generator could not be reached.
    #[error("plan generator unavailable: {0}")]
    Unavailable(String),
}

/// Stateless transform from a free-text description to a plan proposal.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Generates a floor plan and three cost options for `description`.
    async fn generate_plan(&self, description: &str) -> Result<PlanProposal, PlanGeneratorError>;
}
