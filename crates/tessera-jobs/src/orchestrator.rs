//! Per-invocation job orchestration.
//!
//! Every call to [`Orchestrator::run_once`] advances at most one job by one
//! training slice and returns. Nothing survives between calls except the job
//! record and the checkpoint blobs, so the host may kill the process after
//! any invocation without losing more than the slice in flight.
//!
//! Selection, in order:
//! 1. the oldest `Pending` job;
//! 2. else the oldest `Processing` job not updated for `stale_after`, presumed
//!    abandoned by a crashed invocation and reclaimed as is;
//! 3. else nothing ([`InvocationOutcome::Idle`]).
//!
//! Reclaim is not guarded by a compare-and-swap on the job record: two
//! concurrent invocations that observe the same stale job will both train it.

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::job::{JobStatus, TrainingJob};
use crate::storage::{CheckpointStore, EmbeddingSink, GraphSource, JobQueue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::GraphSnapshot;
use tessera_kge::{
    augment, checkpoint_path, load_model, save_model, CheckpointProgress, EmbeddingStore,
    StructuralContext, TrainingConfig, TransETrainer,
};
use tracing::{debug, error, info, warn};

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum InvocationOutcome {
    /// No job was eligible.
    Idle,
    /// A slice was trained and checkpointed; more remain.
    Progress(InvocationSummary),
    /// The final slice was trained and the vectors persisted.
    Completed(InvocationSummary),
}

impl InvocationOutcome {
    pub fn summary(&self) -> Option<&InvocationSummary> {
        match self {
            Self::Idle => None,
            Self::Progress(s) | Self::Completed(s) => Some(s),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// What one invocation did to its job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSummary {
    pub message: String,
    pub job_id: String,
    pub status: JobStatus,
    pub nodes_processed: usize,
    pub edges_processed: usize,
    /// Epochs trained so far, including this slice.
    pub processed_epochs: usize,
    /// Average loss of the last epoch of this slice.
    pub final_loss: Option<f32>,
    /// Vectors written at finalization.
    #[serde(default)]
    pub persisted_embeddings: usize,
    /// Vectors whose write failed and was skipped.
    #[serde(default)]
    pub skipped_embeddings: usize,
}

/// Drives training jobs through the storage seams.
pub struct Orchestrator<'a> {
    config: OrchestratorConfig,
    graphs: &'a dyn GraphSource,
    jobs: &'a dyn JobQueue,
    checkpoints: &'a dyn CheckpointStore,
    sink: &'a dyn EmbeddingSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: OrchestratorConfig,
        graphs: &'a dyn GraphSource,
        jobs: &'a dyn JobQueue,
        checkpoints: &'a dyn CheckpointStore,
        sink: &'a dyn EmbeddingSink,
    ) -> Self {
        Self {
            config,
            graphs,
            jobs,
            checkpoints,
            sink,
        }
    }

    /// Orchestrator over a backend that implements every seam.
    pub fn with_backend<B>(config: OrchestratorConfig, backend: &'a B) -> Self
    where
        B: GraphSource + JobQueue + CheckpointStore + EmbeddingSink,
    {
        Self::new(config, backend, backend, backend, backend)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Create a `Pending` job for `scope_id`.
    ///
    /// Missing arguments fall back to the configured defaults.
    pub fn enqueue(
        &self,
        scope_id: &str,
        training: Option<TrainingConfig>,
        total_epoch_budget: Option<usize>,
    ) -> Result<TrainingJob> {
        let training = training.unwrap_or_else(|| self.config.default_training.clone());
        training.validate()?;
        let budget = total_epoch_budget.unwrap_or(self.config.default_total_epochs);

        let job = TrainingJob::new(scope_id, training, budget);
        self.jobs.enqueue(job.clone())?;
        info!(job_id = %job.id, scope_id, budget, "enqueued training job");
        Ok(job)
    }

    /// Advance one job, using the current time.
    pub fn run_once(&self) -> Result<InvocationOutcome> {
        self.run_once_at(Utc::now())
    }

    /// Advance one job as of `now`.
    ///
    /// A job that fails while training or persisting is marked `Failed` and
    /// the error is returned.
    pub fn run_once_at(&self, now: DateTime<Utc>) -> Result<InvocationOutcome> {
        let Some((mut job, reclaimed)) = self.select_job(now)? else {
            debug!("no eligible training job");
            return Ok(InvocationOutcome::Idle);
        };

        if reclaimed {
            warn!(
                job_id = %job.id,
                updated_at = %job.updated_at,
                "reclaiming stale job"
            );
        }

        job.status = JobStatus::Processing;
        job.started_at.get_or_insert(now);
        job.updated_at = now;
        self.jobs.save(&job)?;

        info!(
            job_id = %job.id,
            scope_id = %job.scope_id,
            processed_epochs = job.processed_epochs,
            total_epoch_budget = job.total_epoch_budget,
            "picked up training job"
        );

        match self.advance(&mut job, now) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(job_id = %job.id, error = %e, "training job failed");
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                job.updated_at = now;
                if let Err(save_err) = self.jobs.save(&job) {
                    error!(job_id = %job.id, error = %save_err, "could not record job failure");
                }
                Err(e)
            }
        }
    }

    /// The job the next invocation at `now` would pick, and whether picking
    /// it is a stale reclaim.
    pub fn select_job(&self, now: DateTime<Utc>) -> Result<Option<(TrainingJob, bool)>> {
        if let Some(job) = self.jobs.oldest(JobStatus::Pending)? {
            return Ok(Some((job, false)));
        }

        let Some(threshold) = self.stale_threshold(now) else {
            return Ok(None);
        };
        Ok(self.jobs.oldest_stale(threshold)?.map(|job| (job, true)))
    }

    fn stale_threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let window = chrono::Duration::from_std(self.config.stale_after).ok()?;
        now.checked_sub_signed(window)
    }

    fn advance(&self, job: &mut TrainingJob, now: DateTime<Utc>) -> Result<InvocationOutcome> {
        let snapshot = self.graphs.fetch_graph(&job.scope_id)?;
        let triplets = snapshot.triplets();
        let entities = snapshot.entity_ids();
        let relations = snapshot.relation_types();

        let mut store = self.restore(job)?;
        let seed = job.config.seed.wrapping_add(job.processed_epochs as u64);
        let mut trainer = TransETrainer::seeded(seed);
        trainer.initialize(&mut store, &entities, &relations)?;
        let report = trainer.train(&mut store, &triplets, job.processed_epochs)?;

        // The slice counts in full even when the trainer stopped early.
        let processed = job.processed_epochs + job.config.epochs;
        let final_loss = (report.epochs_run > 0).then_some(report.final_loss);

        let mut summary = InvocationSummary {
            message: String::new(),
            job_id: job.id.clone(),
            status: JobStatus::Processing,
            nodes_processed: entities.len(),
            edges_processed: triplets.len(),
            processed_epochs: processed,
            final_loss,
            persisted_embeddings: 0,
            skipped_embeddings: 0,
        };

        if job.config.epochs >= job.remaining_epochs() {
            let (persisted, skipped) = self.finalize(&job.scope_id, &snapshot, &store)?;
            let removed = self.checkpoints.delete_job(&job.id)?;

            job.status = JobStatus::Completed;
            job.processed_epochs = processed;
            job.checkpoint_ref = None;
            job.error = None;
            job.updated_at = now;
            self.jobs.save(job)?;

            info!(
                job_id = %job.id,
                processed_epochs = processed,
                persisted,
                skipped,
                checkpoints_removed = removed,
                "training job completed"
            );

            summary.status = JobStatus::Completed;
            summary.persisted_embeddings = persisted;
            summary.skipped_embeddings = skipped;
            summary.message = format!(
                "Training completed after {} epochs; persisted {} embeddings",
                processed, persisted
            );
            return Ok(InvocationOutcome::Completed(summary));
        }

        let progress = CheckpointProgress {
            processed_epochs: processed,
            last_loss: final_loss,
        };
        let bytes = save_model(&store, progress)?;
        let path = checkpoint_path(&job.id, processed);
        self.checkpoints.put(&path, bytes)?;

        job.processed_epochs = processed;
        job.checkpoint_ref = Some(path);
        job.updated_at = now;
        self.jobs.save(job)?;

        info!(
            job_id = %job.id,
            processed_epochs = processed,
            total_epoch_budget = job.total_epoch_budget,
            loss = ?final_loss,
            "checkpoint written"
        );

        summary.message = format!(
            "Trained {} of {} epochs",
            processed, job.total_epoch_budget
        );
        Ok(InvocationOutcome::Progress(summary))
    }

    /// Store to continue from: the job's latest checkpoint, or a fresh one.
    fn restore(&self, job: &TrainingJob) -> Result<EmbeddingStore> {
        if job.processed_epochs == 0 {
            return Ok(EmbeddingStore::new(job.config.clone()));
        }

        let path = job
            .checkpoint_ref
            .clone()
            .unwrap_or_else(|| checkpoint_path(&job.id, job.processed_epochs));

        match self.checkpoints.get(&path)? {
            Some(bytes) => {
                let (store, progress) = load_model(&bytes)?;
                if store.config() != &job.config {
                    return Err(tessera_kge::Error::ConfigMismatch.into());
                }
                debug!(
                    job_id = %job.id,
                    path = %path,
                    checkpoint_epochs = progress.processed_epochs,
                    "restored checkpoint"
                );
                Ok(store)
            }
            None => {
                warn!(job_id = %job.id, path = %path, "checkpoint missing, starting fresh");
                Ok(EmbeddingStore::new(job.config.clone()))
            }
        }
    }

    /// Augment and persist every vector of the scope.
    ///
    /// Per-id persistence failures are logged and skipped; any other storage
    /// error aborts. Returns `(persisted, skipped)`.
    fn finalize(
        &self,
        scope_id: &str,
        snapshot: &GraphSnapshot,
        store: &EmbeddingStore,
    ) -> Result<(usize, usize)> {
        let mut persisted = 0;
        let mut skipped = 0;

        for id in snapshot.entity_ids() {
            let base = store.require_entity(id.as_str())?;
            let context = match snapshot.node(id.as_str()) {
                Some(node) => StructuralContext::new(node.label(), scope_id, node.payload_size()),
                None => StructuralContext::new(id.as_str(), scope_id, 0),
            };
            let embedding = augment(base, &context);
            match self.sink.write_entity_embedding(scope_id, id.as_str(), &embedding) {
                Ok(()) => persisted += 1,
                Err(e) if e.is_persistence() => {
                    warn!(entity = %id, error = %e, "skipping entity embedding");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let counts = snapshot.relation_counts();
        for relation in snapshot.relation_types() {
            let base = store.require_relation(relation.as_str())?;
            let edges = counts.get(&relation).copied().unwrap_or(0);
            let context = StructuralContext::new(relation.as_str(), scope_id, edges);
            let embedding = augment(base, &context);
            match self
                .sink
                .write_relation_embedding(scope_id, relation.as_str(), &embedding)
            {
                Ok(()) => persisted += 1,
                Err(e) if e.is_persistence() => {
                    warn!(relation = %relation, error = %e, "skipping relation embedding");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.sink.flush(scope_id)?;
        Ok((persisted, skipped))
    }
}
