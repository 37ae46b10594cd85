//! Training job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_kge::TrainingConfig;
use uuid::Uuid;

/// Lifecycle state of a [`TrainingJob`].
///
/// ```text
/// Pending -> Processing -> Completed
///                 |  ^
///                 |  +--- stale reclaim (stays Processing)
///                 v
///               Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One resumable training run over a graph scope.
///
/// `processed_epochs` always matches the checkpoint named by
/// `checkpoint_ref`: both are updated together, after the blob is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingJob {
    pub id: String,
    /// Graph or topic the job trains on.
    pub scope_id: String,
    pub status: JobStatus,
    pub processed_epochs: usize,
    pub total_epoch_budget: usize,
    /// Key of the latest checkpoint blob, if any.
    #[serde(default)]
    pub checkpoint_ref: Option<String>,
    pub config: TrainingConfig,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Failure message of a `Failed` job.
    #[serde(default)]
    pub error: Option<String>,
}

impl TrainingJob {
    /// New `Pending` job with a random id.
    pub fn new(
        scope_id: impl Into<String>,
        config: TrainingConfig,
        total_epoch_budget: usize,
    ) -> Self {
        Self::new_at(scope_id, config, total_epoch_budget, Utc::now())
    }

    /// New `Pending` job created at `now`.
    pub fn new_at(
        scope_id: impl Into<String>,
        config: TrainingConfig,
        total_epoch_budget: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scope_id: scope_id.into(),
            status: JobStatus::Pending,
            processed_epochs: 0,
            total_epoch_budget,
            checkpoint_ref: None,
            config,
            created_at: now,
            started_at: None,
            updated_at: now,
            error: None,
        }
    }

    /// Use a caller-chosen id instead of a random one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Epochs left before the budget is exhausted.
    pub fn remaining_epochs(&self) -> usize {
        self.total_epoch_budget.saturating_sub(self.processed_epochs)
    }

    /// Fraction of the budget already trained, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_epoch_budget == 0 {
            return 1.0;
        }
        (self.processed_epochs as f64 / self.total_epoch_budget as f64).min(1.0)
    }

    /// A `Processing` job last touched before `threshold`.
    pub fn is_stale(&self, threshold: DateTime<Utc>) -> bool {
        self.status == JobStatus::Processing && self.updated_at < threshold
    }
}
