//! Event sink port.

use crate::events::domain::DomainEvent;

/// Receiver of emitted domain events.
///
/// Delivery is fire-and-forget: a sink must not block the emitting
/// mutation and reports its own failures through logging.
pub trait EventSink: Send + Sync {
    /// Accepts one event.
    fn publish(&self, event: &DomainEvent);
}
