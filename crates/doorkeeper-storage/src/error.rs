use thiserror::Error;

/// Storage-specific error types for the credential store and its persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Records could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted data exists but is not a valid record collection
    #[error("Corrupt credential data: {0}")]
    Corrupt(String),

    /// A record with this UID is already stored
    #[error("Duplicate credential: {uid}")]
    Duplicate { uid: String },

    /// No record with this UID is stored
    #[error("Credential not found: {uid}")]
    NotFound { uid: String },

    /// Backend refused the write
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for doorkeeper_core::Error {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Duplicate { uid } => Self::AlreadyRegistered { uid },
            StorageError::NotFound { uid } => Self::NotFound { uid },
            other => Self::Persistence(other.to_string()),
        }
    }
}
