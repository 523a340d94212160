//! Timer handler port.

use crate::scheduler::domain::{ScheduledTimer, TimerDisposition};
use async_trait::async_trait;
use thiserror::Error;

/// Error reported by a handler; the timer is kept and fired again later.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerHandlerError {
    /// The payload does not describe work this handler understands.
    #[error("malformed timer payload: {0}")]
    MalformedPayload(String),

    /// The handler could not complete the work.
    #[error("timer handler failed: {0}")]
    Failed(String),
}

/// Work executed when a timer of a given kind becomes due.
///
/// Delivery is at-least-once, so implementations must tolerate repeated
/// invocations for the same scheduling and for timers whose captured state
/// no longer matches the owning entity.
#[async_trait]
pub trait TimerHandler: Send + Sync {
    /// Fires `timer` and reports what to do with it next.
    async fn fire(&self, timer: &ScheduledTimer) -> Result<TimerDisposition, TimerHandlerError>;
}
