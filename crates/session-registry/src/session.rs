//! Session status types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Whether the session is currently active
    pub active: bool,
    /// Number of sub-agents/workers attached to the session
    pub agent_count: usize,
}

/// Returned by [`SessionRegistry::initialize_session`](crate::SessionRegistry::initialize_session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Session identifier
    pub session_id: String,
    /// false when the session was already registered
    pub newly_registered: bool,
    /// Status at the time of the call
    pub status: SessionStatus,
}

/// Registry bookkeeping for one session
#[derive(Debug, Clone)]
pub(crate) struct SessionEntry {
    pub active: bool,
    pub agent_count: usize,
    pub registered_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn new() -> Self {
        Self {
            active: true,
            agent_count: 0,
            registered_at: Utc::now(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            active: self.active,
            agent_count: self.agent_count,
        }
    }
}
