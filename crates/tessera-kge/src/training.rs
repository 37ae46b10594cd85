//! TransE training loop.
//!
//! TransE interprets relations as translations: `h + r ≈ t`. Training
//! contrasts each positive triplet with a corrupted one and minimizes the
//! margin ranking loss
//!
//! ```text
//! L = max(0, margin + ‖h + r − t‖ − ‖h' + r − t'‖)
//! ```
//!
//! 1. For each positive triplet `(h, r, t)`:
//! 2.   Corrupt the head or the tail (fair coin) with a different entity
//! 3.   Score both triplets
//! 4.   If the loss is positive, pull the positive triplet together and push
//!      the negative one apart
//!
//! # Update rule
//!
//! The step is a bounded heuristic, not the analytic gradient of `L`. For
//! each of the two triplets, `diff = h + r − t` is scaled by
//! `min(lr / max(score, 0.1), 10·lr)`; positive head and relation move
//! against `diff` and the positive tail moves with it, while the negative
//! triplet moves the opposite way. Embeddings already persisted downstream
//! were trained with this rule, so it must not change without retraining.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{EntityId, RelationType, Triplet};
//! use tessera_kge::{EmbeddingStore, TrainingConfig, TransETrainer};
//!
//! let triplets = vec![
//!     Triplet::new("Einstein", "won", "NobelPrize"),
//!     Triplet::new("Paris", "capitalOf", "France"),
//! ];
//! let entities: Vec<EntityId> = ["Einstein", "NobelPrize", "Paris", "France"]
//!     .into_iter()
//!     .map(EntityId::from)
//!     .collect();
//! let relations = vec![RelationType::from("won"), RelationType::from("capitalOf")];
//!
//! let config = TrainingConfig::default().with_dimensions(16).with_epochs(10);
//! let mut store = EmbeddingStore::new(config);
//! let mut trainer = TransETrainer::seeded(7);
//!
//! trainer.initialize(&mut store, &entities, &relations)?;
//! let report = trainer.train(&mut store, &triplets, 0)?;
//! assert!(report.final_loss.is_finite());
//! # Ok::<(), tessera_kge::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::store::EmbeddingStore;
use crate::vector;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_core::{EntityId, RelationType, Triplet};
use tracing::debug;

/// Training stops once the epoch-average loss falls below this.
pub const EARLY_STOP_LOSS: f32 = 0.01;

/// All embeddings are renormalized on every n-th epoch.
pub const RENORMALIZE_EVERY: usize = 5;

/// Scores below this are clamped when computing the step size.
pub const MIN_STEP_SCORE: f32 = 0.1;

/// Upper bound on the step size, as a multiple of the learning rate.
pub const MAX_STEP_MULTIPLIER: f32 = 10.0;

/// Training configuration.
///
/// Fixed for the lifetime of a job: every checkpoint of a job carries the same
/// config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    /// Embedding dimension (default: 50).
    pub dimensions: usize,
    /// Learning rate (default: 0.01).
    pub learning_rate: f32,
    /// Margin for ranking loss (default: 1.0).
    pub margin: f32,
    /// Epochs per invocation slice (default: 25).
    pub epochs: usize,
    /// Batch size (default: 32).
    pub batch_size: usize,
    /// Random seed (default: 42).
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dimensions: 50,
            learning_rate: 0.01,
            margin: 1.0,
            epochs: 25,
            batch_size: 32,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the trainer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::Validation("dimensions must be positive".into()));
        }
        if self.epochs == 0 {
            return Err(Error::Validation("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Validation("batchSize must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Validation(format!(
                "learningRate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(Error::Validation(format!(
                "margin must be non-negative, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Outcome of one call to [`TransETrainer::train`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Epochs actually run (fewer than configured on early stop).
    pub epochs_run: usize,
    /// Average loss over the last epoch run.
    pub final_loss: f32,
    /// Average loss per epoch.
    pub loss_history: Vec<f32>,
    /// Whether the loss threshold ended the run.
    pub stopped_early: bool,
}

/// TransE trainer with an injected random source.
///
/// The trainer holds no embeddings; every operation borrows the
/// [`EmbeddingStore`] it works on.
#[derive(Debug, Clone)]
pub struct TransETrainer<R = ChaCha8Rng> {
    rng: R,
}

impl TransETrainer<ChaCha8Rng> {
    /// Trainer driven by a ChaCha8 stream seeded with `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> TransETrainer<R> {
    /// Trainer driven by an arbitrary random source.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Initialize embeddings for every id the store does not hold yet.
    ///
    /// Coordinates are drawn from `U[-√(6/D), √(6/D)]` and the vector is then
    /// unit-normalized. Ids already present keep their vectors, so a store
    /// restored from a checkpoint is never re-randomized. Ids are processed
    /// in the given order, keeping seeded runs reproducible.
    ///
    /// Returns the number of vectors created.
    pub fn initialize(
        &mut self,
        store: &mut EmbeddingStore,
        entities: &[EntityId],
        relations: &[RelationType],
    ) -> Result<usize> {
        store.config().validate()?;

        let dim = store.dimensions();
        let bound = (6.0 / dim as f32).sqrt();
        let mut created = 0;

        for id in entities {
            if store.entity(id.as_str()).is_none() {
                let v = self.random_unit_vector(dim, bound);
                store.insert_entity(id.as_str(), v)?;
                created += 1;
            }
        }
        for rel in relations {
            if store.relation(rel.as_str()).is_none() {
                let v = self.random_unit_vector(dim, bound);
                store.insert_relation(rel.as_str(), v)?;
                created += 1;
            }
        }

        debug!(
            created,
            entities = store.num_entities(),
            relations = store.num_relations(),
            "initialized embeddings"
        );
        Ok(created)
    }

    fn random_unit_vector(&mut self, dim: usize, bound: f32) -> Vec<f32> {
        let mut v: Vec<f32> = (0..dim).map(|_| self.rng.gen_range(-bound..=bound)).collect();
        vector::normalize_in_place(&mut v);
        v
    }

    /// Corrupt the head or the tail of `positive` with a different entity.
    ///
    /// `pool` must hold at least two distinct ids.
    pub fn corrupt(&mut self, positive: &Triplet, pool: &[String]) -> Result<Triplet> {
        if pool.len() < 2 {
            return Err(Error::InsufficientEntities(pool.len()));
        }

        let corrupt_head = self.rng.gen_bool(0.5);
        let original = if corrupt_head {
            positive.head.as_str()
        } else {
            positive.tail.as_str()
        };

        // Rejection sampling below needs at least one id to switch to.
        if pool.iter().all(|id| id == original) {
            let distinct: HashSet<&String> = pool.iter().collect();
            return Err(Error::InsufficientEntities(distinct.len()));
        }

        let replacement = loop {
            let candidate = &pool[self.rng.gen_range(0..pool.len())];
            if candidate != original {
                break candidate.clone();
            }
        };

        let mut negative = positive.clone();
        if corrupt_head {
            negative.head = EntityId::new(replacement);
        } else {
            negative.tail = EntityId::new(replacement);
        }
        Ok(negative)
    }

    /// Sample a negative for `positive` and apply one update.
    ///
    /// Returns the margin loss before the update.
    pub fn train_triplet(
        &mut self,
        store: &mut EmbeddingStore,
        positive: &Triplet,
        pool: &[String],
    ) -> Result<f32> {
        let negative = self.corrupt(positive, pool)?;
        self.train_pair(store, positive, &negative)
    }

    /// Apply one margin-ranking update for an explicit positive/negative pair.
    ///
    /// When `score(positive) + margin <= score(negative)` the loss is zero and
    /// no vector is touched.
    pub fn train_pair(
        &self,
        store: &mut EmbeddingStore,
        positive: &Triplet,
        negative: &Triplet,
    ) -> Result<f32> {
        let (pos_diff, pos_score) = residual(store, positive)?;
        let (neg_diff, neg_score) = residual(store, negative)?;

        let config = store.config();
        let loss = (config.margin + pos_score - neg_score).max(0.0);
        if loss <= 0.0 {
            return Ok(0.0);
        }

        let lr = config.learning_rate;
        let pos_step = step_size(lr, pos_score);
        let neg_step = step_size(lr, neg_score);

        // Diffs were taken before any write, so shared vectors (the relation,
        // and the uncorrupted endpoint) receive both updates.
        store.nudge_entity(positive.head.as_str(), &pos_diff, -pos_step)?;
        store.nudge_relation(positive.relation.as_str(), &pos_diff, -pos_step)?;
        store.nudge_entity(positive.tail.as_str(), &pos_diff, pos_step)?;

        store.nudge_entity(negative.head.as_str(), &neg_diff, neg_step)?;
        store.nudge_relation(negative.relation.as_str(), &neg_diff, neg_step)?;
        store.nudge_entity(negative.tail.as_str(), &neg_diff, -neg_step)?;

        Ok(loss)
    }

    /// Run one slice of `config.epochs` epochs.
    ///
    /// `epoch_offset` is the number of epochs already trained in earlier
    /// slices; it keeps the renormalization cadence aligned across resumes.
    pub fn train(
        &mut self,
        store: &mut EmbeddingStore,
        triplets: &[Triplet],
        epoch_offset: usize,
    ) -> Result<TrainingReport> {
        store.config().validate()?;

        if triplets.is_empty() {
            debug!("no triplets to train on");
            return Ok(TrainingReport::default());
        }

        let pool = store.entity_ids();
        if pool.len() < 2 {
            return Err(Error::InsufficientEntities(pool.len()));
        }

        let epochs = store.config().epochs;
        let batch_size = store.config().batch_size;
        let mut order: Vec<&Triplet> = triplets.iter().collect();
        let mut report = TrainingReport {
            loss_history: Vec::with_capacity(epochs),
            ..TrainingReport::default()
        };

        for epoch in 0..epochs {
            order.shuffle(&mut self.rng);

            let mut batch_loss_sum = 0.0;
            let mut num_batches = 0;

            for batch in order.chunks(batch_size) {
                let mut batch_loss = 0.0;
                for &triplet in batch {
                    batch_loss += self.train_triplet(store, triplet, &pool)?;
                }
                batch_loss_sum += batch_loss / batch.len() as f32;
                num_batches += 1;
            }

            let avg_loss = batch_loss_sum / num_batches as f32;
            report.loss_history.push(avg_loss);
            report.final_loss = avg_loss;
            report.epochs_run = epoch + 1;

            let global_epoch = epoch_offset + epoch + 1;
            debug!(epoch = global_epoch, loss = avg_loss, "epoch finished");

            if global_epoch % RENORMALIZE_EVERY == 0 {
                store.normalize_all();
            }

            if avg_loss < EARLY_STOP_LOSS {
                debug!(epoch = global_epoch, "loss below threshold, stopping early");
                report.stopped_early = true;
                break;
            }
        }

        Ok(report)
    }
}

/// `(h + r − t, ‖h + r − t‖)` for one triplet.
fn residual(store: &EmbeddingStore, triplet: &Triplet) -> Result<(Vec<f32>, f32)> {
    let (h, r, t) = store.triplet_vectors(triplet)?;
    let diff = vector::translation_residual(h, r, t)?;
    let score = vector::l2_norm(&diff);
    Ok((diff, score))
}

/// Bounded step: `min(lr / max(score, 0.1), 10·lr)`.
#[inline]
fn step_size(lr: f32, score: f32) -> f32 {
    (lr / score.max(MIN_STEP_SCORE)).min(lr * MAX_STEP_MULTIPLIER)
}
