//! Orchestrator configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tessera_kge::TrainingConfig;

/// A `Processing` job untouched for this long is presumed abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(35);

/// Epoch budget of jobs enqueued without an explicit one.
pub const DEFAULT_TOTAL_EPOCHS: usize = 100;

/// Orchestrator configuration.
///
/// ```json
/// { "staleAfterSecs": 35, "defaultTotalEpochs": 100, "defaultTraining": { "epochs": 25 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Staleness threshold for reclaiming `Processing` jobs (default: 35 s).
    #[serde(rename = "staleAfterSecs", with = "duration_secs")]
    pub stale_after: Duration,
    /// Training config given to newly enqueued jobs.
    pub default_training: TrainingConfig,
    /// Epoch budget given to newly enqueued jobs (default: 100).
    pub default_total_epochs: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            default_training: TrainingConfig::default(),
            default_total_epochs: DEFAULT_TOTAL_EPOCHS,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_default_training(mut self, config: TrainingConfig) -> Self {
        self.default_training = config;
        self
    }

    pub fn with_default_total_epochs(mut self, epochs: usize) -> Self {
        self.default_total_epochs = epochs;
        self
    }

    /// Load from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
