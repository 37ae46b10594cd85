use thiserror::Error;

/// Errors that can occur in tessera-jobs.
#[derive(Error, Debug)]
pub enum Error {
    /// Training, checkpoint or augmentation failure.
    #[error(transparent)]
    Kge(#[from] tessera_kge::Error),
    /// Filesystem backend I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// No job with this id.
    #[error("Job not found: {0}")]
    JobNotFound(String),
    /// Backend refused or could not complete an operation.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Writing one augmented vector failed.
    #[error("Failed to persist embedding for {id}: {message}")]
    Persistence { id: String, message: String },
}

impl Error {
    /// Whether this error came from a single failed vector write.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

/// Result type alias for tessera-jobs.
pub type Result<T> = std::result::Result<T, Error>;
