use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
        /// Underlying driver error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A compare-and-set update kept losing against concurrent writers.
    #[error("storage contention: {message}")]
    Contention {
        /// What kept conflicting.
        message: String,
    },
    /// The backend holds data that violates one of its own invariants.
    #[error("storage inconsistent: {message}")]
    Inconsistent {
        /// Which invariant broke.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Shorthand for [`StorageError::Inconsistent`].
    pub fn inconsistent(message: impl Into<String>) -> Self {
        StorageError::Inconsistent {
            message: message.into(),
        }
    }
}
