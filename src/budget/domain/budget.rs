//! Per-project budget ledger.

use super::{BudgetDomainError, Money, Threshold};
use crate::task_graph::domain::ProjectId;
use serde::{Deserialize, Serialize};

/// Ledger a spend amount is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendCategory {
    /// Contracted but not yet paid.
    Committed,
    /// Paid out.
    Spent,
}

/// Traffic-light budget health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Below 75% of the approved budget, or no approved budget.
    #[default]
    Green,
    /// From 75% up to 90%.
    Yellow,
    /// At or above 90%.
    Red,
}

impl AlertLevel {
    /// Derives the level from a burn rate in basis points.
    #[must_use]
    pub const fn from_burn_rate(burn_rate_bps: Option<u64>) -> Self {
        match burn_rate_bps {
            Some(9_000..) => Self::Red,
            Some(7_500..) => Self::Yellow,
            _ => Self::Green,
        }
    }
}

/// Approved, committed, and spent totals for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBudget {
    project_id: ProjectId,
    approved: Option<Money>,
    committed: Money,
    spent: Money,
}

impl ProjectBudget {
    /// Creates an empty ledger with no approved budget.
    #[must_use]
    pub const fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            approved: None,
            committed: Money::ZERO,
            spent: Money::ZERO,
        }
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the approved budget, if one has been set.
    #[must_use]
    pub const fn approved(&self) -> Option<Money> {
        self.approved
    }

    /// Returns the committed total.
    #[must_use]
    pub const fn committed(&self) -> Money {
        self.committed
    }

    /// Returns the spent total.
    #[must_use]
    pub const fn spent(&self) -> Money {
        self.spent
    }

    /// Returns the amount measured against thresholds: the larger of
    /// committed and spent.
    #[must_use]
    pub fn exposure(&self) -> Money {
        self.committed.max(self.spent)
    }

    /// Returns exposure as basis points of the approved budget.
    ///
    /// `None` while no positive approved budget exists.
    #[must_use]
    pub fn burn_rate_bps(&self) -> Option<u64> {
        let approved = self.approved.filter(|amount| amount.minor_units() > 0)?;
        let ratio = (i128::from(self.exposure().minor_units()) * 10_000)
            .checked_div(i128::from(approved.minor_units()))?;
        Some(u64::try_from(ratio.max(0)).unwrap_or(u64::MAX))
    }

    /// Returns whether exposure is at or above `threshold`.
    #[must_use]
    pub fn reaches(&self, threshold: Threshold) -> bool {
        self.approved
            .is_some_and(|approved| threshold.is_reached(self.exposure(), approved))
    }

    /// Returns whether `spent <= committed <= approved` holds.
    ///
    /// Without an approved budget only `spent <= committed` is checked.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.spent <= self.committed
            && self
                .approved
                .is_none_or(|approved| self.committed <= approved)
    }

    /// Replaces the approved budget.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetDomainError::NegativeAmount`] for a negative amount.
    pub const fn set_approved(&mut self, amount: Money) -> Result<(), BudgetDomainError> {
        if amount.is_negative() {
            return Err(BudgetDomainError::NegativeAmount(amount));
        }
        self.approved = Some(amount);
        Ok(())
    }

    /// Adds `amount` to the ledger for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetDomainError::NegativeAmount`] for a negative amount and
    /// [`BudgetDomainError::Overflow`] when the total is not representable.
    pub fn record(
        &mut self,
        category: SpendCategory,
        amount: Money,
    ) -> Result<(), BudgetDomainError> {
        if amount.is_negative() {
            return Err(BudgetDomainError::NegativeAmount(amount));
        }
        let total = match category {
            SpendCategory::Committed => &mut self.committed,
            SpendCategory::Spent => &mut self.spent,
        };
        *total = total
            .checked_add(amount)
            .ok_or(BudgetDomainError::Overflow)?;
        Ok(())
    }

    /// Returns a read-only summary.
    #[must_use]
    pub fn summary(&self) -> BudgetSummary {
        let exposure = self.exposure();
        let burn_rate_bps = self.burn_rate_bps();
        BudgetSummary {
            project_id: self.project_id,
            approved: self.approved,
            committed: self.committed,
            spent: self.spent,
            exposure,
            remaining: self
                .approved
                .and_then(|approved| approved.checked_sub(exposure)),
            burn_rate_bps,
            alert_level: AlertLevel::from_burn_rate(burn_rate_bps),
        }
    }
}

/// Point-in-time view of a project budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Project the summary describes.
    pub project_id: ProjectId,
    /// Approved budget, if set.
    pub approved: Option<Money>,
    /// Committed total.
    pub committed: Money,
    /// Spent total.
    pub spent: Money,
    /// Larger of committed and spent.
    pub exposure: Money,
    /// Approved minus exposure, if a budget is approved.
    pub remaining: Option<Money>,
    /// Exposure in basis points of the approved budget.
    pub burn_rate_bps: Option<u64>,
    /// Traffic-light health.
    pub alert_level: AlertLevel,
}
