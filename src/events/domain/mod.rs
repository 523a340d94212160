//! Domain event envelope and payloads.

mod event;

pub use event::{DomainEvent, EventId, EventPayload};
