//! Failover configuration and backup selection

use serde::{Deserialize, Serialize};
use session_registry::SessionRegistry;

/// Failover settings for one session; the latest configuration wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailoverConfig {
    /// Tried in order
    pub backup_coordinators: Vec<String>,
    /// Consecutive coordinator failures before failover triggers
    pub failover_threshold: u32,
    /// Trigger failover automatically once the threshold is reached
    pub auto_failover: bool,
}

/// Picks which backup coordinator a session fails over to
pub trait BackupSelector: Send + Sync {
    /// Choose from `backups`, skipping `current`
    ///
    /// Returns `None` when no backup is usable.
    fn select(
        &self,
        backups: &[String],
        current: Option<&str>,
        registry: &SessionRegistry,
    ) -> Option<String>;
}

/// First backup in configuration order that is registered and active
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl BackupSelector for FirstAvailable {
    fn select(
        &self,
        backups: &[String],
        current: Option<&str>,
        registry: &SessionRegistry,
    ) -> Option<String> {
        backups
            .iter()
            .filter(|backup| Some(backup.as_str()) != current)
            .find(|backup| registry.is_active(backup))
            .cloned()
    }
}

/// Result of reporting a coordinator failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FailureOutcome {
    /// No failover configuration exists for the session
    NotConfigured,
    /// Counted; threshold not reached yet
    Recorded {
        consecutive_failures: u32,
        threshold: u32,
    },
    /// Threshold reached but failover was not performed, either because
    /// auto-failover is off or because no backup was usable
    ThresholdReached {
        consecutive_failures: u32,
        auto_failover: bool,
    },
    /// Automatic failover moved the session to `coordinator`
    FailedOver { coordinator: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backups(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_first_available_skips_unknown_and_inactive() {
        let registry = SessionRegistry::new();
        registry.initialize_session("b2").unwrap();
        registry.initialize_session("b3").unwrap();
        registry.set_active("b2", false);

        let chosen = FirstAvailable.select(&backups(&["b1", "b2", "b3"]), None, &registry);
        assert_eq!(chosen, Some("b3".to_string()));
    }

    #[test]
    fn test_first_available_skips_current() {
        let registry = SessionRegistry::new();
        registry.initialize_session("b1").unwrap();
        registry.initialize_session("b2").unwrap();

        let chosen = FirstAvailable.select(&backups(&["b1", "b2"]), Some("b1"), &registry);
        assert_eq!(chosen, Some("b2".to_string()));
    }

    #[test]
    fn test_no_usable_backup() {
        let registry = SessionRegistry::new();
        assert_eq!(FirstAvailable.select(&backups(&["b1"]), None, &registry), None);
        assert_eq!(FirstAvailable.select(&[], None, &registry), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(FailureOutcome::FailedOver {
            coordinator: "b1".to_string(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed_over");
        assert_eq!(json["coordinator"], "b1");
    }
}
