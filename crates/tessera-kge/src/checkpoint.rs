//! Checkpoint codec.
//!
//! A checkpoint is a JSON document holding an [`EmbeddingStore`] together with
//! the progress counters of the job that produced it:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "processedEpochs": 25,
//!   "lastLoss": 0.42,
//!   "config": { "dimensions": 50, "learningRate": 0.01, ... },
//!   "entityEmbeddings": { "A": [...], ... },
//!   "relationEmbeddings": { "loves": [...], ... }
//! }
//! ```
//!
//! `schemaVersion` is checked before anything else is decoded, so a format
//! change can never be misread as an older layout.

use crate::error::{Error, Result};
use crate::store::EmbeddingStore;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current checkpoint format revision.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// Progress counters stored alongside the embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointProgress {
    /// Epochs trained so far across all invocations.
    pub processed_epochs: usize,
    /// Final loss of the most recent slice.
    pub last_loss: Option<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointOut<'a> {
    schema_version: u32,
    #[serde(flatten)]
    progress: CheckpointProgress,
    config: &'a TrainingConfig,
    entity_embeddings: &'a HashMap<String, Vec<f32>>,
    relation_embeddings: &'a HashMap<String, Vec<f32>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointIn {
    #[serde(flatten)]
    progress: CheckpointProgress,
    config: TrainingConfig,
    entity_embeddings: HashMap<String, Vec<f32>>,
    relation_embeddings: HashMap<String, Vec<f32>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionProbe {
    schema_version: u32,
}

/// Serialize a store and its progress counters.
pub fn save_model(store: &EmbeddingStore, progress: CheckpointProgress) -> Result<Vec<u8>> {
    let doc = CheckpointOut {
        schema_version: CHECKPOINT_SCHEMA_VERSION,
        progress,
        config: store.config(),
        entity_embeddings: store.entity_embeddings(),
        relation_embeddings: store.relation_embeddings(),
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Restore a store and its progress counters.
///
/// Vectors are validated against the stored dimension and renormalized.
pub fn load_model(bytes: &[u8]) -> Result<(EmbeddingStore, CheckpointProgress)> {
    let probe: VersionProbe = serde_json::from_slice(bytes)?;
    if probe.schema_version != CHECKPOINT_SCHEMA_VERSION {
        return Err(Error::UnsupportedCheckpointVersion {
            found: probe.schema_version,
            supported: CHECKPOINT_SCHEMA_VERSION,
        });
    }

    let doc: CheckpointIn = serde_json::from_slice(bytes)?;
    let mut store =
        EmbeddingStore::from_parts(doc.config, doc.entity_embeddings, doc.relation_embeddings)?;
    store.normalize_all();
    Ok((store, doc.progress))
}

/// Key of every checkpoint blob belonging to `job_id`.
pub fn checkpoint_prefix(job_id: &str) -> String {
    format!("checkpoints/{}/", job_id)
}

/// Key of the checkpoint written after `processed_epochs` epochs.
///
/// Zero-padded so that lexical order matches epoch order.
pub fn checkpoint_path(job_id: &str, processed_epochs: usize) -> String {
    format!("{}epoch-{:06}.json", checkpoint_prefix(job_id), processed_epochs)
}
