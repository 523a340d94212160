//! Event bus fanning events out to registered sinks.

use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::events::{
    domain::{DomainEvent, EventPayload},
    ports::EventSink,
};
use crate::task_graph::domain::ProjectId;

/// Fan-out of domain events to every registered sink.
///
/// Clones share the same sinks.
#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    /// Creates a bus with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of registered sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Wraps `payload` in an envelope and delivers it to every sink.
    pub fn emit(
        &self,
        project_id: ProjectId,
        payload: EventPayload,
        clock: &impl Clock,
    ) -> DomainEvent {
        let event = DomainEvent::new(project_id, payload, clock);
        debug!(
            event_id = %event.id,
            project_id = %event.project_id,
            event_type = event.event_type(),
            "emitting domain event"
        );
        for sink in &self.sinks {
            sink.publish(&event);
        }
        event
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
