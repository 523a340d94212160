//! Dispute categories, severities, and canned resolution options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject matter of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeCategory {
    /// Workmanship or materials fall short of the agreed standard.
    Quality,
    /// Work is late or the schedule is contested.
    Timeline,
    /// Costs or payments are contested.
    Budget,
    /// The extent of contracted work is contested.
    Scope,
    /// A hazard to people on or near the site.
    Safety,
    /// Parties are not responding or are talking past each other.
    Communication,
}

impl DisputeCategory {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Timeline => "timeline",
            Self::Budget => "budget",
            Self::Scope => "scope",
            Self::Safety => "safety",
            Self::Communication => "communication",
        }
    }

    /// Returns the severity a dispute of this category is filed with.
    #[must_use]
    pub const fn severity(self) -> DisputeSeverity {
        match self {
            Self::Safety => DisputeSeverity::Critical,
            Self::Quality | Self::Budget => DisputeSeverity::High,
            Self::Timeline | Self::Scope => DisputeSeverity::Medium,
            Self::Communication => DisputeSeverity::Low,
        }
    }

    /// Returns the resolution options offered during mediation.
    #[must_use]
    pub fn resolution_options(self) -> Vec<ResolutionOption> {
        let table: &[(&str, &str, &str, &str, bool)] = match self {
            Self::Quality => &[
                (
                    "q1",
                    "Rework at contractor's expense",
                    "Contractor redoes the affected work to meet the agreed standard",
                    "Schedule slips while the work is redone; no added cost to the owner",
                    true,
                ),
                (
                    "q2",
                    "Partial credit and acceptance",
                    "Owner accepts the work as-is in exchange for a credit",
                    "No schedule impact; reduced contract value",
                    false,
                ),
                (
                    "q3",
                    "Third-party quality assessment",
                    "An independent inspector assesses the work and both parties accept the finding",
                    "Adds inspection cost and a short delay",
                    false,
                ),
            ],
            Self::Timeline => &[
                (
                    "t1",
                    "Accelerated schedule with overtime",
                    "Contractor adds crew hours to recover the lost time",
                    "Recovers schedule; overtime cost to be agreed",
                    true,
                ),
                (
                    "t2",
                    "Revised timeline acceptance",
                    "Both parties agree a new completion date",
                    "Later completion; no added cost",
                    false,
                ),
                (
                    "t3",
                    "Penalty clause enforcement",
                    "Delay penalties from the contract are applied",
                    "Compensates the owner; may strain the relationship",
                    false,
                ),
            ],
            Self::Budget => &[
                (
                    "b1",
                    "Value engineering review",
                    "Review the remaining scope for cheaper equivalent materials and methods",
                    "Can recover cost without reducing scope",
                    true,
                ),
                (
                    "b2",
                    "Formal change order process",
                    "Document the contested cost as a change order for approval",
                    "Clarifies liability; may raise the approved budget",
                    false,
                ),
                (
                    "b3",
                    "Competitive re-bid",
                    "Re-bid the contested work package to other contractors",
                    "Market price check; adds delay and switching cost",
                    false,
                ),
            ],
            Self::Scope | Self::Safety | Self::Communication => &[
                (
                    "d1",
                    "Direct negotiation",
                    "Parties meet and agree terms without outside help",
                    "Fastest and cheapest when both parties engage",
                    true,
                ),
                (
                    "d2",
                    "Mediated discussion",
                    "A neutral mediator facilitates the discussion",
                    "Adds mediator cost; improves the chance of agreement",
                    false,
                ),
                (
                    "d3",
                    "Contract review and arbitration",
                    "The contract terms are reviewed and an arbitrator decides",
                    "Binding outcome; slowest and most expensive",
                    false,
                ),
            ],
        };
        table
            .iter()
            .map(
                |&(option_id, title, description, impact, recommended)| ResolutionOption {
                    option_id: option_id.to_owned(),
                    title: title.to_owned(),
                    description: description.to_owned(),
                    impact: impact.to_owned(),
                    recommended,
                },
            )
            .collect()
    }
}

impl fmt::Display for DisputeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeSeverity {
    /// Can wait for the normal schedule.
    Low,
    /// Needs attention within the stage deadline.
    Medium,
    /// Affects cost or quality materially.
    High,
    /// Affects safety; needs immediate attention.
    Critical,
}

impl DisputeSeverity {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for DisputeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolution path offered to the parties during mediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOption {
    /// Short stable identifier such as `q1`.
    pub option_id: String,
    /// Headline.
    pub title: String,
    /// What the option involves.
    pub description: String,
    /// Expected cost and schedule impact.
    pub impact: String,
    /// Whether this is the suggested default.
    pub recommended: bool,
}
