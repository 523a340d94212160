//! Event sink and notifier adapters.
//!
//! - [`memory::RecordingSink`]: captures events for assertions
//! - [`broadcast::BroadcastSink`]: live-update fan-out over a
//!   `tokio::sync::broadcast` channel
//! - [`tracing_notifier::TracingNotifier`]: logs rendered notifications

pub mod broadcast;
pub mod memory;
pub mod tracing_notifier;
