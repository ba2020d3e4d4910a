//! Error types for session coordination

use session_store::StoreError;

/// Result type for coordination operations
pub type Result<T> = std::result::Result<T, CoordinationError>;

/// Errors raised by the coordination engine
///
/// Most engine operations report expected failures as `false` or `None`.
/// These variants cover caller bugs and rehydration failures.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// Operation requires a registered session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Group definition violates membership rules
    #[error("Invalid group {group_id}: {reason}")]
    InvalidGroup { group_id: String, reason: String },

    /// State store failure while restoring engine tables
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl CoordinationError {
    /// Create a session not found error
    pub fn session_not_found<S: Into<String>>(session_id: S) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Create an invalid group error
    pub fn invalid_group<G: Into<String>, R: Into<String>>(group_id: G, reason: R) -> Self {
        Self::InvalidGroup {
            group_id: group_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_names_session() {
        let err = CoordinationError::session_not_found("worker-7");
        assert_eq!(err.to_string(), "Session not found: worker-7");
    }

    #[test]
    fn test_invalid_group_message() {
        let err = CoordinationError::invalid_group("g1", "coordinator is not a member");
        assert_eq!(
            err.to_string(),
            "Invalid group g1: coordinator is not a member"
        );
    }

    #[test]
    fn test_from_store_error() {
        let err = CoordinationError::from(StoreError::storage("disk full"));
        assert!(matches!(err, CoordinationError::Store(_)));
    }
}
