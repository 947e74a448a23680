//! Error types for the version store

use thiserror::Error;

/// Errors that can occur in the version store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The owner, item path, or revision does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller supplied an id, path, revision, or pattern the store rejects
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The underlying storage failed, is inconsistent, or timed out
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// True when the error means "this thing does not exist" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<git2::Error> for StoreError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => {
                StoreError::NotFound(err.message().to_string())
            }
            git2::ErrorCode::InvalidSpec | git2::ErrorCode::Ambiguous => {
                StoreError::InvalidInput(err.message().to_string())
            }
            _ => StoreError::StorageUnavailable(format!("git: {}", err.message())),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(err.to_string()),
            _ => StoreError::StorageUnavailable(err.to_string()),
        }
    }
}
