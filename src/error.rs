//! Facade error types.

use thiserror::Error;

use crate::contract::BoxError;

/// Result type for facade operations.
pub type UtilitiesResult<T> = Result<T, UtilitiesError>;

/// Errors raised by the utilities facade.
#[derive(Debug, Error)]
pub enum UtilitiesError {
    #[error("storage not initialized: call `init` with a Firebase app before uploading files")]
    StorageNotInitialized,

    #[error("database not initialized: call `init` with a Firebase app before updating documents")]
    DatabaseNotInitialized,

    #[error("cannot build CSV from an empty record list")]
    EmptyInput,

    #[error("record at index {index} has no text `name` field")]
    MissingName { index: usize },

    #[error("JSON encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("vendor operation failed: {0}")]
    Vendor(#[source] BoxError),

    #[error("failed to persist {filename}: {source}")]
    Persist {
        filename: String,
        #[source]
        source: BoxError,
    },
}

impl UtilitiesError {
    /// True for the two "call `init` first" failures.
    pub fn is_not_initialized(&self) -> bool {
        matches!(
            self,
            UtilitiesError::StorageNotInitialized | UtilitiesError::DatabaseNotInitialized
        )
    }
}
