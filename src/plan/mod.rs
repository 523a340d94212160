//! Contract for the external plan and cost estimation transform.
//!
//! Turning a free-text description into a floor plan is an external,
//! stateless collaborator. This context fixes its input and output shape so
//! the coordinator can bootstrap a project from a chosen cost option.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
