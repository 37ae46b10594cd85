//! Contextual augmentation of trained vectors.
//!
//! The persisted vector of an entity or relation type is the trained vector,
//! forced to [`D_BASE`] components, followed by [`D_CONTEXT`] structural
//! features. The total length [`D_TOTAL`] is a storage contract with the
//! persistence layer, which is why [`ContextualEmbedding`] is a fixed-size
//! array and rejects any other length when deserialized.
//!
//! Features are deterministic functions of the structural metadata:
//!
//! | Slot | Feature |
//! |------|---------|
//! | 0 | stable hash of the label / type, in `[0, 1]` |
//! | 1 | stable hash of the scope id, in `[0, 1]` |
//! | 2 | `min(payload_size, 1000) / 1000` |
//! | 3-4 | zero |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Components taken from the trained vector.
pub const D_BASE: usize = 45;
/// Structural feature components.
pub const D_CONTEXT: usize = 5;
/// Persisted vector length.
pub const D_TOTAL: usize = D_BASE + D_CONTEXT;

/// Payload sizes at or above this map to feature value 1.0.
pub const PAYLOAD_SIZE_CAP: usize = 1000;

const HASH_BUCKETS: u64 = 10_000;

/// Structural metadata of one entity or relation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralContext {
    /// Label of an entity, or the relation type itself.
    pub label: String,
    /// Graph / topic the vector belongs to.
    pub scope_id: String,
    /// Entity: bytes of serialized properties. Relation: edges of that type.
    pub payload_size: usize,
}

impl StructuralContext {
    pub fn new(label: impl Into<String>, scope_id: impl Into<String>, payload_size: usize) -> Self {
        Self {
            label: label.into(),
            scope_id: scope_id.into(),
            payload_size,
        }
    }

    /// The [`D_CONTEXT`] feature values.
    pub fn features(&self) -> [f32; D_CONTEXT] {
        let mut features = [0.0; D_CONTEXT];
        features[0] = unit_hash(&self.label);
        features[1] = unit_hash(&self.scope_id);
        features[2] = self.payload_size.min(PAYLOAD_SIZE_CAP) as f32 / PAYLOAD_SIZE_CAP as f32;
        features
    }
}

/// Map a string to `[0, 1]` through SHA-256, stable across platforms and
/// releases.
fn unit_hash(s: &str) -> f32 {
    let digest = Sha256::digest(s.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let bucket = u64::from_be_bytes(prefix) % HASH_BUCKETS;
    bucket as f32 / (HASH_BUCKETS - 1) as f32
}

/// A persisted vector of exactly [`D_TOTAL`] components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ContextualEmbedding([f32; D_TOTAL]);

impl ContextualEmbedding {
    /// All components.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// The trained part.
    pub fn base(&self) -> &[f32] {
        &self.0[..D_BASE]
    }

    /// The structural feature part.
    pub fn context(&self) -> &[f32] {
        &self.0[D_BASE..]
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }
}

impl TryFrom<Vec<f32>> for ContextualEmbedding {
    type Error = Error;

    fn try_from(v: Vec<f32>) -> Result<Self> {
        Self::try_from(v.as_slice())
    }
}

impl TryFrom<&[f32]> for ContextualEmbedding {
    type Error = Error;

    fn try_from(v: &[f32]) -> Result<Self> {
        let array: [f32; D_TOTAL] = v.try_into().map_err(|_| Error::DimensionMismatch {
            expected: D_TOTAL,
            actual: v.len(),
        })?;
        Ok(Self(array))
    }
}

impl From<ContextualEmbedding> for Vec<f32> {
    fn from(e: ContextualEmbedding) -> Self {
        e.0.to_vec()
    }
}

impl AsRef<[f32]> for ContextualEmbedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Blend a trained vector with its structural features.
///
/// The trained vector is truncated or zero-padded to [`D_BASE`].
pub fn augment(base: &[f32], context: &StructuralContext) -> ContextualEmbedding {
    let mut out = [0.0; D_TOTAL];
    let n = base.len().min(D_BASE);
    out[..n].copy_from_slice(&base[..n]);
    out[D_BASE..].copy_from_slice(&context.features());
    ContextualEmbedding(out)
}
