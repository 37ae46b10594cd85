#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

//! Resumable TransE training jobs.
//!
//! Training runs inside invocations with a hard wall-clock limit, so a job is
//! trained in slices: each invocation restores the latest checkpoint, trains
//! `config.epochs` epochs, and writes a new checkpoint (or, after the last
//! slice, persists the augmented vectors and deletes the checkpoints).
//!
//! - [`TrainingJob`] / [`JobStatus`] - the job record
//! - [`storage`] - seams to the graph store, job queue, blob store and
//!   embedding store
//! - [`MemoryBackend`] / [`FsBackend`] - implementations of every seam
//! - [`Orchestrator`] - one invocation's worth of work
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{GraphEdge, GraphNode, GraphSnapshot};
//! use tessera_jobs::{InvocationOutcome, MemoryBackend, Orchestrator, OrchestratorConfig};
//! use tessera_kge::TrainingConfig;
//!
//! let backend = MemoryBackend::new();
//! backend.insert_graph(
//!     "lab",
//!     GraphSnapshot::new(
//!         vec![GraphNode::new("marie"), GraphNode::new("radium")],
//!         vec![GraphEdge::new("marie", "discovered", "radium")],
//!     ),
//! );
//!
//! let orchestrator = Orchestrator::with_backend(OrchestratorConfig::default(), &backend);
//! let training = TrainingConfig::default().with_dimensions(8).with_epochs(10);
//! orchestrator.enqueue("lab", Some(training), Some(10))?;
//!
//! let outcome = orchestrator.run_once()?;
//! assert!(matches!(outcome, InvocationOutcome::Completed(_)));
//! # Ok::<(), tessera_jobs::Error>(())
//! ```

mod config;
mod error;
mod fs;
mod job;
mod memory;
mod orchestrator;
pub mod storage;

pub use config::{OrchestratorConfig, DEFAULT_STALE_AFTER, DEFAULT_TOTAL_EPOCHS};
pub use error::{Error, Result};
pub use fs::FsBackend;
pub use job::{JobStatus, TrainingJob};
pub use memory::MemoryBackend;
pub use orchestrator::{InvocationOutcome, InvocationSummary, Orchestrator};
pub use storage::{
    CheckpointStore, EmbeddingSink, EmbeddingSource, GraphSource, JobQueue, PersistedEmbeddings,
};
