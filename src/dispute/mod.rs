//! Dispute resolution with time-boxed escalation.
//!
//! A dispute moves forward through `identified`, `direct_resolution`,
//! `ai_mediation`, and `external_mediation`, and may be resolved from any of
//! them. Each stage carries a deadline backed by a scheduler timer that
//! captures the stage it was armed for; a timer whose stage no longer
//! matches the dispute is discarded. Transitions for one dispute are
//! serialized, while separate disputes proceed concurrently.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
