//! Renders domain events into notifications.

use minijinja::Environment;
use thiserror::Error;
use tracing::warn;

use crate::events::{
    domain::DomainEvent,
    ports::{EventSink, Notification, Notifier},
};

const TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "phase_status_changed",
        "Phase {{ kind }} is now {{ current }}",
        "The {{ kind }} phase moved from {{ previous }} to {{ current }}.",
    ),
    (
        "dispute_filed",
        "New {{ severity }} {{ category }} dispute",
        "A {{ category }} dispute with {{ counterparty }} was filed and is awaiting direct resolution.",
    ),
    (
        "dispute_escalated",
        "Dispute escalated to {{ to }}",
        "{% if automatic %}The {{ from }} deadline elapsed without resolution{% else %}The dispute was escalated manually{% endif %}; it is now in {{ to }}.",
    ),
    (
        "dispute_stalled",
        "Dispute stalled in {{ stage }}",
        "The {{ stage }} deadline elapsed and no further escalation stage remains. Manual follow-up is required.",
    ),
    (
        "dispute_resolved",
        "Dispute resolved",
        "The dispute was resolved during {{ from }}: {{ outcome }}",
    ),
    (
        "budget_threshold_crossed",
        "Budget {{ threshold }}% threshold reached",
        "Exposure of {{ exposure }} has reached {{ threshold }}% of the approved {{ approved }} budget.",
    ),
    (
        "budget_invariant_violated",
        "Budget out of balance",
        "Spent {{ spent }} and committed {{ committed }} are no longer within the approved {{ approved }}.",
    ),
];

/// Errors raised while rendering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The event payload could not be turned into a template context.
    #[error("failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
    /// Template rendering failed.
    #[error("failed to render notification: {0}")]
    Render(#[from] minijinja::Error),
}

/// Event sink rendering notifications through `minijinja` templates.
///
/// Events without a template (task moves) are live-update only and produce
/// no notification.
pub struct NotificationSink<N>
where
    N: Notifier,
{
    notifier: N,
    environment: Environment<'static>,
}

impl<N> NotificationSink<N>
where
    N: Notifier,
{
    /// Creates a sink delivering rendered notifications to `notifier`.
    #[must_use]
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            environment: Environment::new(),
        }
    }

    /// Renders the notification for `event`, if its type has templates.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when the payload cannot be serialized
    /// or a template fails to render.
    pub fn render(&self, event: &DomainEvent) -> Result<Option<Notification>, NotificationError> {
        let event_type = event.event_type();
        let Some((_, subject, body)) = TEMPLATES.iter().find(|(name, _, _)| *name == event_type)
        else {
            return Ok(None);
        };
        let context = serde_json::to_value(&event.payload)?;
        Ok(Some(Notification {
            project_id: event.project_id,
            event_type: event_type.to_owned(),
            subject: self.environment.render_str(subject, &context)?,
            body: self.environment.render_str(body, &context)?,
        }))
    }
}

impl<N> EventSink for NotificationSink<N>
where
    N: Notifier,
{
    fn publish(&self, event: &DomainEvent) {
        match self.render(event) {
            Ok(Some(notification)) => self.notifier.notify(notification),
            Ok(None) => {}
            Err(error) => warn!(
                event_id = %event.id,
                event_type = event.event_type(),
                %error,
                "failed to render notification"
            ),
        }
    }
}
