//! Domain event fan-out.
//!
//! Every context emits [`domain::DomainEvent`]s through a shared
//! [`services::EventBus`]. Sinks are fire-and-forget: the live-update sink
//! forwards events over a broadcast channel and the notification sink renders
//! them into human-readable notifications for an external transport.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
