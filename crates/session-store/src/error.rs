//! Error types for state store operations

use session_core::CoreError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in a state store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage capacity exceeded
    #[error("Storage capacity exceeded")]
    CapacityExceeded,

    /// Generic error from session-core
    #[error(transparent)]
    CoreError(#[from] CoreError),
}

impl StoreError {
    /// Create a storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }
}
