use std::fmt;
use thiserror::Error;

/// Which namespace a missing embedding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// Entity (node) embedding.
    Entity,
    /// Relation-type embedding.
    Relation,
}

impl fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// Errors that can occur in tessera-kge.
#[derive(Error, Debug)]
pub enum Error {
    /// Two vectors that must share a length do not.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A referenced entity or relation has no stored vector.
    #[error("Missing {kind} embedding: {id}")]
    MissingEmbedding { kind: EmbeddingKind, id: String },
    /// Negative sampling cannot pick a different entity.
    #[error("Negative sampling needs at least two entities, found {0}")]
    InsufficientEntities(usize),
    /// Checkpoint written by an unknown format revision.
    #[error("Unsupported checkpoint schema version {found} (supported: {supported})")]
    UnsupportedCheckpointVersion { found: u32, supported: u32 },
    /// Checkpoint was produced under a different training config.
    #[error("Checkpoint config does not match the job's training config")]
    ConfigMismatch,
    /// Invalid configuration or input.
    #[error("Validation error: {0}")]
    Validation(String),
    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing_entity(id: impl Into<String>) -> Self {
        Self::MissingEmbedding {
            kind: EmbeddingKind::Entity,
            id: id.into(),
        }
    }

    pub(crate) fn missing_relation(id: impl Into<String>) -> Self {
        Self::MissingEmbedding {
            kind: EmbeddingKind::Relation,
            id: id.into(),
        }
    }
}

/// Result type alias for tessera-kge.
pub type Result<T> = std::result::Result<T, Error>;
