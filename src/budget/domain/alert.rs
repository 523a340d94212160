//! Fired budget alerts.

use super::{Money, Threshold};
use crate::task_graph::domain::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a threshold crossing. At most one exists per project and
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAlert {
    /// Project whose budget crossed the threshold.
    pub project_id: ProjectId,
    /// Crossed threshold.
    pub threshold: Threshold,
    /// Exposure when the alert fired.
    pub exposure: Money,
    /// Approved budget when the alert fired.
    pub approved: Money,
    /// When the alert fired.
    pub fired_at: DateTime<Utc>,
}

impl BudgetAlert {
    /// Returns the operator-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.threshold.message()
    }
}
