//! Port contracts for event delivery.

pub mod notifier;
pub mod sink;

pub use notifier::{Notification, Notifier};
pub use sink::EventSink;
