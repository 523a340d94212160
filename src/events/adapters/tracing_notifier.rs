//! Notifier that writes notifications to the tracing log.

use tracing::info;

use crate::events::ports::{Notification, Notifier};

/// Logs each notification at `info` level.
///
/// Stands in for a delivery transport where none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        info!(
            project_id = %notification.project_id,
            event_type = %notification.event_type,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
    }
}
