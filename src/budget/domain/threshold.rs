//! Budget alert thresholds.

use super::{BudgetDomainError, Money};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentage of the approved budget that triggers an alert once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(u16);

impl Threshold {
    /// Creates a threshold from a percentage in `1..=1000`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetDomainError::InvalidThreshold`] outside that range.
    pub const fn new(percent: u16) -> Result<Self, BudgetDomainError> {
        if percent == 0 || percent > 1000 {
            return Err(BudgetDomainError::InvalidThreshold(percent));
        }
        Ok(Self(percent))
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn percent(self) -> u16 {
        self.0
    }

    /// Returns whether `exposure` is at or above this share of `approved`.
    ///
    /// A zero or negative approved budget reaches no threshold.
    #[must_use]
    pub fn is_reached(self, exposure: Money, approved: Money) -> bool {
        if approved.minor_units() <= 0 {
            return false;
        }
        i128::from(exposure.minor_units()) * 100
            >= i128::from(approved.minor_units()) * i128::from(self.0)
    }

    /// Returns the operator-facing alert message for this threshold.
    #[must_use]
    pub fn message(self) -> String {
        match self.0 {
            100.. => "CRITICAL: Budget has been exceeded!".to_owned(),
            90.. => format!("WARNING: {}% of budget has been spent", self.0),
            _ => format!("NOTICE: {}% of budget has been spent", self.0),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
