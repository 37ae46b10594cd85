#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

//! TransE knowledge graph embeddings.
//!
//! Knowledge graphs store facts as (head, relation, tail) triples:
//! `(Einstein, won, NobelPrize)`, `(Paris, capitalOf, France)`.
//! TransE learns a vector per entity and per relation type such that
//! **relations act as translations**:
//!
//! ```text
//!   h ----r----> t
//!   |            |
//!   v            v
//!  [0.2, 0.5] + [0.3, 0.1] ≈ [0.5, 0.6]
//! ```
//!
//! The distance `‖h + r − t‖₂` is the training score (lower is more
//! plausible). Prediction reports the bounded form `1 / (1 + distance)`.
//!
//! ## Pieces
//!
//! | Module | Role |
//! |--------|------|
//! | [`vector`] | Dense `f32` arithmetic with dimension checks |
//! | [`EmbeddingStore`] | Entity and relation vectors plus their config |
//! | [`TransETrainer`] | Initialization, negative sampling, margin updates |
//! | [`save_model`] / [`load_model`] | Versioned JSON checkpoints |
//! | [`augment()`] | Trained vector + structural features, fixed length 50 |
//! | [`Predictor`] | Head / tail / relation prediction and similarity |
//! | [`RankMetrics`] | MR, MRR and Hits@k |
//!
//! ## Usage
//!
//! ```rust
//! use tessera_core::{EntityId, RelationType, Triplet};
//! use tessera_kge::{EmbeddingStore, Predictor, TrainingConfig, TransETrainer};
//!
//! let triplets = vec![Triplet::new("A", "loves", "B")];
//! let entities = vec![EntityId::from("A"), EntityId::from("B")];
//! let relations = vec![RelationType::from("loves")];
//!
//! let mut store = EmbeddingStore::new(TrainingConfig::default().with_dimensions(8));
//! let mut trainer = TransETrainer::seeded(1);
//! trainer.initialize(&mut store, &entities, &relations)?;
//! trainer.train(&mut store, &triplets, 0)?;
//!
//! let predictor = Predictor::from_store(&store);
//! let tails = predictor.predict_tail("A", "loves", 5)?;
//! assert_eq!(tails[0].id, "B");
//! # Ok::<(), tessera_kge::Error>(())
//! ```
//!
//! ## References
//!
//! - Bordes et al. (2013). "Translating Embeddings for Modeling
//!   Multi-relational Data." NIPS.

pub mod augment;
mod checkpoint;
mod error;
mod evaluation;
mod predict;
mod scoring;
mod store;
mod training;
pub mod vector;

pub use augment::{augment, ContextualEmbedding, StructuralContext, D_BASE, D_CONTEXT, D_TOTAL};
pub use checkpoint::{
    checkpoint_path, checkpoint_prefix, load_model, save_model, CheckpointProgress,
    CHECKPOINT_SCHEMA_VERSION,
};
pub use error::{EmbeddingKind, Error, Result};
pub use evaluation::{rank_of, RankMetrics};
pub use predict::{Predictor, EVALUATION_CANDIDATES};
pub use scoring::{plausibility, Prediction};
pub use store::EmbeddingStore;
pub use training::{TrainingConfig, TrainingReport, TransETrainer};
