//! Notification transport port.

use crate::task_graph::domain::ProjectId;
use serde::{Deserialize, Serialize};

/// Rendered, transport-neutral notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Project the notification concerns.
    pub project_id: ProjectId,
    /// Event type that produced the notification.
    pub event_type: String,
    /// Short subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

/// Delivery transport for rendered notifications (email, SMS, push).
pub trait Notifier: Send + Sync {
    /// Hands a notification to the transport without awaiting delivery.
    fn notify(&self, notification: Notification);
}
