//! Session groups with group-scoped shared state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::{CoordinationError, Result};

/// Statuses after which a group is eligible for cleanup
pub const TERMINAL_GROUP_STATUSES: [&str; 2] = ["completed", "failed"];

/// A fixed set of sessions sharing a coordinator and a state namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGroup {
    pub group_id: String,
    /// Fixed at creation
    pub members: BTreeSet<String>,
    /// Always one of `members`
    pub coordinator_session_id: String,
    /// Free-form lifecycle status, unset until first update
    pub status: Option<String>,
    /// Group-scoped key/value store; only members write
    #[serde(default)]
    pub shared_state: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl SessionGroup {
    pub(crate) fn new<I, S>(group_id: &str, session_ids: I, coordinator_id: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: BTreeSet<String> = session_ids.into_iter().map(Into::into).collect();

        if members.is_empty() {
            return Err(CoordinationError::invalid_group(group_id, "group has no members"));
        }
        if !members.contains(coordinator_id) {
            return Err(CoordinationError::invalid_group(
                group_id,
                format!("coordinator {} is not a member", coordinator_id),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            group_id: group_id.to_string(),
            members,
            coordinator_session_id: coordinator_id.to_string(),
            status: None,
            shared_state: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_member(&self, session_id: &str) -> bool {
        self.members.contains(session_id)
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    pub(crate) fn set_status(&mut self, status: String) {
        self.status = Some(status);
        self.updated_at = Utc::now();
    }

    /// Completed or failed, and last changed before `cutoff`
    pub(crate) fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        let terminal = self
            .status
            .as_deref()
            .map(|status| TERMINAL_GROUP_STATUSES.contains(&status))
            .unwrap_or(false);
        terminal && self.updated_at < cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group() {
        let group = SessionGroup::new("g1", ["w1", "w2", "w1"], "w1").unwrap();
        assert_eq!(group.members.len(), 2);
        assert!(group.is_member("w2"));
        assert!(!group.is_member("w3"));
        assert_eq!(group.status, None);
    }

    #[test]
    fn test_coordinator_must_be_member() {
        let result = SessionGroup::new("g1", ["w1", "w2"], "outsider");
        assert!(matches!(result, Err(CoordinationError::InvalidGroup { .. })));
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = SessionGroup::new("g1", Vec::<String>::new(), "w1");
        assert!(matches!(result, Err(CoordinationError::InvalidGroup { .. })));
    }

    #[test]
    fn test_expiry_requires_terminal_status() {
        let mut group = SessionGroup::new("g1", ["w1"], "w1").unwrap();
        let future = Utc::now() + chrono::Duration::seconds(60);

        assert!(!group.is_expired(future));

        group.set_status("active".to_string());
        assert!(!group.is_expired(future));

        group.set_status("completed".to_string());
        assert!(group.is_expired(future));
        assert!(!group.is_expired(group.updated_at));
    }
}
