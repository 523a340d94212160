//! Per-project reconciliation record.

use super::CardMapping;
use crate::task_graph::domain::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Outcome of the latest reconciliation pass for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every task matched the board.
    Synced,
    /// At least one task could not be synchronized and stays pending.
    Pending,
    /// The pass stopped early on shutdown.
    Interrupted,
    /// The project is archived; its mappings were archived.
    Archived,
}

/// What the latest reconciliation pass saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSyncState {
    /// Reconciled project.
    pub project_id: ProjectId,
    /// When the pass finished.
    pub synced_at: DateTime<Utc>,
    /// Pass outcome.
    pub status: SyncStatus,
    /// Fingerprint of the project's card mappings after the pass.
    pub board_hash: String,
}

/// Returns a SHA-256 fingerprint of card mappings, independent of order.
#[must_use]
pub fn board_state_hash(mappings: &[CardMapping]) -> String {
    let mut rows: Vec<String> = mappings
        .iter()
        .map(|mapping| {
            format!(
                "{}|{}|{}",
                mapping.card_id(),
                mapping.external_revision().value(),
                mapping.is_archived()
            )
        })
        .collect();
    rows.sort_unstable();
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
