//! Batch enrichment job status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Polled progress snapshot of the enrichment job
///
/// `total`/`completed`/`running` are the progress triple; the remaining
/// fields describe the most recent run (or the current one while running).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStatus {
    pub total: usize,
    pub completed: usize,
    pub running: bool,
    /// Items whose tags were written
    pub updated: usize,
    /// Items that could not be read or written
    pub failed: usize,
    /// Items never started because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Result of a start request that did not conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A run was started over `total` un-tagged assets
    Started { run_id: Uuid, total: usize },
    /// No un-tagged assets; the job stayed idle
    NothingToDo,
}
