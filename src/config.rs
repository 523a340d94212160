//! Operational tuning for the coordination core.
//!
//! Backoff schedules, reconciliation staleness, dispute stage deadlines, and
//! budget thresholds are deployment parameters rather than domain rules. They
//! load from TOML with per-field defaults so a partial file only overrides
//! what it names.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::board_sync::domain::BoardLayout;
use crate::budget::domain::Threshold;

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but violates a configuration rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Board synchronization settings.
    #[serde(default)]
    pub board: BoardSyncConfig,

    /// Dispute escalation settings.
    #[serde(default)]
    pub disputes: DisputeConfig,

    /// Budget watcher settings.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Timer firing loop settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl CoordinatorConfig {
    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when a value fails validation.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field rules that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.validate()?;
        self.budget.validate()?;
        self.scheduler.validate()
    }
}

/// Board synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSyncConfig {
    /// Per-call timeout for board operations, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Total attempts for a board operation before it is left pending.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay, in milliseconds. Doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single retry delay, in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Age after which a card mapping is re-fetched during reconciliation, in
    /// seconds.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,

    /// Interval between reconciliation passes for a project, in seconds.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Board lists and the statuses they stand for.
    #[serde(default)]
    pub layout: BoardLayout,
}

impl BoardSyncConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "board.max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.backoff_base_ms > self.backoff_cap_ms {
            return Err(ConfigError::Invalid(format!(
                "board.backoff_base_ms ({}) exceeds board.backoff_cap_ms ({})",
                self.backoff_base_ms, self.backoff_cap_ms
            )));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "board.reconcile_interval_secs must be positive".to_owned(),
            ));
        }
        self.layout
            .validate()
            .map_err(|error| ConfigError::Invalid(format!("board.layout: {error}")))
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Returns the reconciliation staleness threshold.
    #[must_use]
    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.staleness_secs))
    }

    /// Returns the reconciliation interval.
    #[must_use]
    pub fn reconcile_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.reconcile_interval_secs))
    }
}

impl Default for BoardSyncConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            staleness_secs: default_staleness_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            layout: BoardLayout::default(),
        }
    }
}

/// Dispute stage deadlines, in hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeConfig {
    /// Time allowed in `identified` before moving to direct resolution.
    #[serde(default = "default_identified_hours")]
    pub identified_hours: u32,

    /// Time allowed in `direct_resolution` before AI mediation.
    #[serde(default = "default_direct_resolution_hours")]
    pub direct_resolution_hours: u32,

    /// Time allowed in `ai_mediation` before external mediation.
    #[serde(default = "default_ai_mediation_hours")]
    pub ai_mediation_hours: u32,

    /// Time allowed in `external_mediation` before the dispute is reported as
    /// stalled.
    #[serde(default = "default_external_mediation_hours")]
    pub external_mediation_hours: u32,
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            identified_hours: default_identified_hours(),
            direct_resolution_hours: default_direct_resolution_hours(),
            ai_mediation_hours: default_ai_mediation_hours(),
            external_mediation_hours: default_external_mediation_hours(),
        }
    }
}

/// Budget watcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Alert thresholds as percentages of the approved budget.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u16>,

    /// Interval between periodic budget reviews, in hours.
    #[serde(default = "default_review_interval_hours")]
    pub review_interval_hours: u32,
}

impl BudgetConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.is_empty() {
            return Err(ConfigError::Invalid(
                "budget.thresholds must not be empty".to_owned(),
            ));
        }
        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|percent| **percent == 0 || **percent > 1000)
        {
            return Err(ConfigError::Invalid(format!(
                "budget threshold {bad}% is outside 1..=1000"
            )));
        }
        if self.review_interval_hours == 0 {
            return Err(ConfigError::Invalid(
                "budget.review_interval_hours must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the configured thresholds as validated values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a percentage outside `1..=1000`.
    pub fn threshold_set(&self) -> Result<Vec<Threshold>, ConfigError> {
        self.thresholds
            .iter()
            .map(|percent| {
                Threshold::new(*percent)
                    .map_err(|error| ConfigError::Invalid(format!("budget.thresholds: {error}")))
            })
            .collect()
    }

    /// Returns the review interval.
    #[must_use]
    pub fn review_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.review_interval_hours))
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            review_interval_hours: default_review_interval_hours(),
        }
    }
}

/// Timer firing loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Sleep between firing passes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum timers taken from the store per pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl SchedulerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.batch_size must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

const fn default_call_timeout_ms() -> u64 {
    10_000
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_backoff_base_ms() -> u64 {
    250
}

const fn default_backoff_cap_ms() -> u64 {
    8_000
}

const fn default_staleness_secs() -> u64 {
    30 * 60
}

const fn default_reconcile_interval_secs() -> u64 {
    15 * 60
}

const fn default_identified_hours() -> u32 {
    4
}

const fn default_direct_resolution_hours() -> u32 {
    72
}

const fn default_ai_mediation_hours() -> u32 {
    96
}

const fn default_external_mediation_hours() -> u32 {
    14 * 24
}

fn default_thresholds() -> Vec<u16> {
    vec![75, 90, 100]
}

const fn default_review_interval_hours() -> u32 {
    24
}

const fn default_poll_interval_ms() -> u64 {
    1_000
}

const fn default_batch_size() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoordinatorConfig};
    use crate::board_sync::domain::ListId;
    use crate::task_graph::domain::TaskStatus;
    use rstest::rstest;

    #[rstest]
    fn empty_document_yields_defaults() {
        let config = CoordinatorConfig::from_toml_str("").expect("empty config is valid");

        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.budget.thresholds, vec![75, 90, 100]);
        assert_eq!(config.disputes.identified_hours, 4);
        assert_eq!(config.board.reconcile_interval_secs, 900);
    }

    #[rstest]
    fn partial_document_overrides_named_fields_only() {
        let config = CoordinatorConfig::from_toml_str(
            r"
            [board]
            max_attempts = 2

            [disputes]
            direct_resolution_hours = 48
            ",
        )
        .expect("partial config is valid");

        assert_eq!(config.board.max_attempts, 2);
        assert_eq!(config.board.backoff_base_ms, 250);
        assert_eq!(config.disputes.direct_resolution_hours, 48);
        assert_eq!(config.disputes.ai_mediation_hours, 96);
    }

    #[rstest]
    #[case("[board]\nmax_attempts = 0\n")]
    #[case("[board]\nbackoff_base_ms = 9000\nbackoff_cap_ms = 100\n")]
    #[case("[budget]\nthresholds = []\n")]
    #[case("[budget]\nthresholds = [0, 90]\n")]
    #[case("[scheduler]\nbatch_size = 0\n")]
    fn invalid_values_are_rejected(#[case] document: &str) {
        let result = CoordinatorConfig::from_toml_str(document);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[rstest]
    fn board_layout_accepts_extra_list_aliases() {
        let config = CoordinatorConfig::from_toml_str(
            r#"
            [board.layout]
            done = "complete"

            [board.layout.aliases]
            punch_list = "in_progress"
            "#,
        )
        .expect("layout override is valid");

        let layout = &config.board.layout;
        let complete = ListId::new("complete").expect("valid list id");
        let punch_list = ListId::new("punch_list").expect("valid list id");
        assert_eq!(layout.status_for(&complete), Some(TaskStatus::Done));
        assert_eq!(layout.status_for(&punch_list), Some(TaskStatus::InProgress));
        assert_eq!(layout.list_for(TaskStatus::Done), &complete);
    }

    #[rstest]
    fn board_layout_with_shared_target_list_is_rejected() {
        let result = CoordinatorConfig::from_toml_str(
            "[board.layout]\nblocked = \"in_progress\"\n",
        );

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[rstest]
    fn thresholds_convert_to_domain_values() {
        let config = CoordinatorConfig::default();

        let thresholds = config
            .budget
            .threshold_set()
            .expect("default thresholds are valid");

        let percents: Vec<u16> = thresholds.iter().map(|threshold| threshold.percent()).collect();
        assert_eq!(percents, vec![75, 90, 100]);
    }

    #[rstest]
    fn malformed_toml_is_a_parse_error() {
        let result = CoordinatorConfig::from_toml_str("[board\nmax_attempts = 1");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
