//! Storage seams between the orchestrator and the outside world.
//!
//! | Trait | Backing data |
//! |-------|--------------|
//! | [`GraphSource`] | Graph rows of one scope |
//! | [`JobQueue`] | Training job records |
//! | [`CheckpointStore`] | Checkpoint blobs keyed by path |
//! | [`EmbeddingSink`] | Augmented vectors written at finalization |
//! | [`EmbeddingSource`] | The same vectors, read back for prediction |
//!
//! All traits are synchronous and take `&self`; implementations use interior
//! locking so one backend value can be shared between threads.

use crate::error::Result;
use crate::job::{JobStatus, TrainingJob};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::GraphSnapshot;
use tessera_kge::{ContextualEmbedding, Predictor};

/// Read access to the graph store.
pub trait GraphSource: Send + Sync {
    /// Live nodes and edges of `scope_id`. Unknown scopes yield an empty
    /// snapshot.
    fn fetch_graph(&self, scope_id: &str) -> Result<GraphSnapshot>;
}

/// Persistent training job records.
pub trait JobQueue: Send + Sync {
    /// Insert a new job. Fails if the id is taken.
    fn enqueue(&self, job: TrainingJob) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<TrainingJob>>;

    /// All jobs, oldest first.
    fn list(&self) -> Result<Vec<TrainingJob>>;

    /// Overwrite an existing job record.
    fn save(&self, job: &TrainingJob) -> Result<()>;

    /// Oldest job (by `created_at`, then id) in `status`.
    fn oldest(&self, status: JobStatus) -> Result<Option<TrainingJob>> {
        Ok(earliest_created(
            self.list()?.into_iter().filter(|j| j.status == status),
        ))
    }

    /// Oldest `Processing` job last touched before `threshold`.
    fn oldest_stale(&self, threshold: DateTime<Utc>) -> Result<Option<TrainingJob>> {
        Ok(earliest_created(
            self.list()?.into_iter().filter(|j| j.is_stale(threshold)),
        ))
    }
}

fn earliest_created(jobs: impl Iterator<Item = TrainingJob>) -> Option<TrainingJob> {
    jobs.min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

/// Checkpoint blob storage.
pub trait CheckpointStore: Send + Sync {
    fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Remove every blob of `job_id`. Returns how many were removed.
    fn delete_job(&self, job_id: &str) -> Result<usize>;
}

/// Destination of augmented vectors.
///
/// A failed write affects only that one id; the orchestrator logs it and
/// moves on.
pub trait EmbeddingSink: Send + Sync {
    fn write_entity_embedding(
        &self,
        scope_id: &str,
        entity_id: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()>;

    fn write_relation_embedding(
        &self,
        scope_id: &str,
        relation_type: &str,
        embedding: &ContextualEmbedding,
    ) -> Result<()>;

    /// Make buffered writes for `scope_id` durable.
    fn flush(&self, _scope_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Read access to persisted vectors.
pub trait EmbeddingSource: Send + Sync {
    fn load_embeddings(&self, scope_id: &str) -> Result<PersistedEmbeddings>;
}

/// Augmented vectors of one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEmbeddings {
    #[serde(default)]
    pub entities: BTreeMap<String, ContextualEmbedding>,
    #[serde(default)]
    pub relations: BTreeMap<String, ContextualEmbedding>,
}

impl PersistedEmbeddings {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Overwrite entries with those of `other`.
    pub fn merge(&mut self, other: PersistedEmbeddings) {
        self.entities.extend(other.entities);
        self.relations.extend(other.relations);
    }

    /// Predictor over these vectors.
    pub fn into_predictor(self) -> Predictor {
        Predictor::from_contextual(
            self.entities.into_iter().collect(),
            self.relations.into_iter().collect(),
        )
    }
}
