//! Event bus and notification rendering.

mod bus;
mod notification;

pub use bus::EventBus;
pub use notification::{NotificationError, NotificationSink};
