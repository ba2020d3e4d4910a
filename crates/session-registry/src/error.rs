//! Error types for the session registry

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors in session registration
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Session IDs must be non-empty
    #[error("Invalid session ID: {0:?}")]
    InvalidId(String),
}

impl RegistryError {
    /// Create an invalid ID error
    pub fn invalid_id<S: Into<String>>(session_id: S) -> Self {
        Self::InvalidId(session_id.into())
    }
}
