//! Time allowed in each dispute stage.

use super::DisputeStage;
use crate::config::DisputeConfig;
use chrono::Duration;

/// Deadline length per escalation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDeadlines {
    /// Time allowed in `identified`.
    pub identified: Duration,
    /// Time allowed in `direct_resolution`.
    pub direct_resolution: Duration,
    /// Time allowed in `ai_mediation`.
    pub ai_mediation: Duration,
    /// Time allowed in `external_mediation` before a stall is reported.
    pub external_mediation: Duration,
}

impl StageDeadlines {
    /// Returns the time allowed in `stage`, or `None` for `resolved`.
    #[must_use]
    pub const fn for_stage(&self, stage: DisputeStage) -> Option<Duration> {
        match stage {
            DisputeStage::Identified => Some(self.identified),
            DisputeStage::DirectResolution => Some(self.direct_resolution),
            DisputeStage::AiMediation => Some(self.ai_mediation),
            DisputeStage::ExternalMediation => Some(self.external_mediation),
            DisputeStage::Resolved => None,
        }
    }
}

impl Default for StageDeadlines {
    fn default() -> Self {
        Self::from(&DisputeConfig::default())
    }
}

impl From<&DisputeConfig> for StageDeadlines {
    fn from(config: &DisputeConfig) -> Self {
        Self {
            identified: Duration::hours(i64::from(config.identified_hours)),
            direct_resolution: Duration::hours(i64::from(config.direct_resolution_hours)),
            ai_mediation: Duration::hours(i64::from(config.ai_mediation_hours)),
            external_mediation: Duration::hours(i64::from(config.external_mediation_hours)),
        }
    }
}
