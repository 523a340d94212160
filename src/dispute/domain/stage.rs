//! Dispute lifecycle stages.

use super::ParseDisputeStageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispute lifecycle stage, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStage {
    /// Filed and awaiting acknowledgement.
    Identified,
    /// The parties negotiate directly.
    DirectResolution,
    /// The platform mediates with generated resolution options.
    AiMediation,
    /// An outside mediator is involved.
    ExternalMediation,
    /// Closed with an outcome.
    Resolved,
}

impl DisputeStage {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identified => "identified",
            Self::DirectResolution => "direct_resolution",
            Self::AiMediation => "ai_mediation",
            Self::ExternalMediation => "external_mediation",
            Self::Resolved => "resolved",
        }
    }

    /// Returns the position in the lifecycle; later stages rank higher.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Identified => 0,
            Self::DirectResolution => 1,
            Self::AiMediation => 2,
            Self::ExternalMediation => 3,
            Self::Resolved => 4,
        }
    }

    /// Returns the stage escalation moves to, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Identified => Some(Self::DirectResolution),
            Self::DirectResolution => Some(Self::AiMediation),
            Self::AiMediation => Some(Self::ExternalMediation),
            Self::ExternalMediation | Self::Resolved => None,
        }
    }

    /// Returns whether the stage is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl fmt::Display for DisputeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DisputeStage {
    type Error = ParseDisputeStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "identified" => Ok(Self::Identified),
            "direct_resolution" => Ok(Self::DirectResolution),
            "ai_mediation" => Ok(Self::AiMediation),
            "external_mediation" => Ok(Self::ExternalMediation),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseDisputeStageError(value.to_owned())),
        }
    }
}
