//! Live-update sink backed by a broadcast channel.

use tokio::sync::broadcast;
use tracing::trace;

use crate::events::{domain::DomainEvent, ports::EventSink};

/// Forwards events to every live subscriber.
///
/// Slow subscribers observe `RecvError::Lagged` rather than blocking
/// emitters; events published with no subscriber attached are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastSink {
    /// Creates a sink buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attaches a new live-update subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &DomainEvent) {
        if self.sender.send(event.clone()).is_err() {
            trace!(event_type = event.event_type(), "no live-update subscribers");
        }
    }
}
