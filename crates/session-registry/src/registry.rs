//! Session registry for existence and liveness lookups

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::session::{SessionEntry, SessionHandle, SessionStatus};
use crate::{RegistryError, Result};

/// Registry of coordinatable sessions
///
/// The single source of truth for "does this session exist". Lookups for
/// unknown or removed sessions return `None` rather than an error. Cloning
/// yields another handle to the same registry.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Register `session_id` as active with no agents
    ///
    /// Idempotent: an already registered session keeps its current state.
    pub fn initialize_session(&self, session_id: &str) -> Result<SessionHandle> {
        if session_id.trim().is_empty() {
            return Err(RegistryError::invalid_id(session_id));
        }

        let (newly_registered, status) = match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(entry) => (false, entry.get().status()),
            Entry::Vacant(entry) => {
                let status = entry.insert(SessionEntry::new()).status();
                (true, status)
            }
        };

        if newly_registered {
            tracing::debug!("Registered session: {}", session_id);
        }

        Ok(SessionHandle {
            session_id: session_id.to_string(),
            newly_registered,
            status,
        })
    }

    /// Current status, `None` for unknown or removed sessions
    pub fn get_session_status(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.get(session_id).map(|entry| entry.status())
    }

    /// True if the session is registered and active
    pub fn is_active(&self, session_id: &str) -> bool {
        self.get_session_status(session_id)
            .map(|status| status.active)
            .unwrap_or(false)
    }

    /// When the session was first registered
    pub fn registered_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(session_id).map(|entry| entry.registered_at)
    }

    /// Mark a session active or inactive
    ///
    /// # Returns
    /// false if the session is not registered
    pub fn set_active(&self, session_id: &str, active: bool) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.active = active;
                tracing::debug!("Session {} active={}", session_id, active);
                true
            }
            None => false,
        }
    }

    /// Attach one agent to a session, returning the new count
    pub fn register_agent(&self, session_id: &str) -> Option<usize> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            entry.agent_count += 1;
            entry.agent_count
        })
    }

    /// Detach one agent from a session, returning the new count
    pub fn release_agent(&self, session_id: &str) -> Option<usize> {
        self.sessions.get_mut(session_id).map(|mut entry| {
            entry.agent_count = entry.agent_count.saturating_sub(1);
            entry.agent_count
        })
    }

    /// Remove a session; later lookups return `None`
    pub fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            tracing::debug!("Removed session: {}", session_id);
        }
        removed
    }

    /// All registered session IDs, sorted
    pub fn list_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of active sessions
    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|e| e.value().active).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
