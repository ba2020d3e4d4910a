//! Migration planning
//!
//! A plan is advisory: the engine produces it, the caller executes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forward migration steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    PauseSource,
    SnapshotState,
    TransferSnapshot,
    RepointCoordinator,
    ResumeOnTarget,
    VerifyConsistency,
}

impl MigrationStep {
    pub const ALL: [MigrationStep; 6] = [
        MigrationStep::PauseSource,
        MigrationStep::SnapshotState,
        MigrationStep::TransferSnapshot,
        MigrationStep::RepointCoordinator,
        MigrationStep::ResumeOnTarget,
        MigrationStep::VerifyConsistency,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            MigrationStep::PauseSource => "Pause the session on its source coordinator",
            MigrationStep::SnapshotState => "Snapshot the session state",
            MigrationStep::TransferSnapshot => "Transfer the snapshot to the target coordinator",
            MigrationStep::RepointCoordinator => "Repoint the session to the target coordinator",
            MigrationStep::ResumeOnTarget => "Resume the session on the target coordinator",
            MigrationStep::VerifyConsistency => "Verify post-migration state consistency",
        }
    }

    /// The step that undoes this one
    pub fn rollback(&self) -> RollbackStep {
        match self {
            MigrationStep::PauseSource => RollbackStep::ResumeSource,
            MigrationStep::SnapshotState => RollbackStep::DiscardSnapshot,
            MigrationStep::TransferSnapshot => RollbackStep::DeleteTransferredSnapshot,
            MigrationStep::RepointCoordinator => RollbackStep::RestoreCoordinator,
            MigrationStep::ResumeOnTarget => RollbackStep::PauseTarget,
            MigrationStep::VerifyConsistency => RollbackStep::DiscardVerification,
        }
    }
}

/// Steps undoing a partially applied migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStep {
    DiscardVerification,
    PauseTarget,
    RestoreCoordinator,
    DeleteTransferredSnapshot,
    DiscardSnapshot,
    ResumeSource,
}

impl RollbackStep {
    pub fn description(&self) -> &'static str {
        match self {
            RollbackStep::DiscardVerification => "Discard post-migration verification results",
            RollbackStep::PauseTarget => "Pause the session on the target coordinator",
            RollbackStep::RestoreCoordinator => "Restore the original session-to-coordinator mapping",
            RollbackStep::DeleteTransferredSnapshot => "Delete the snapshot copied to the target",
            RollbackStep::DiscardSnapshot => "Discard the source snapshot",
            RollbackStep::ResumeSource => "Resume the session on its source coordinator",
        }
    }
}

/// Ordered, reversible plan for relocating a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub session_id: String,
    /// Coordinator the session is assigned to when the plan was made
    pub source_coordinator: Option<String>,
    pub target_coordinator: String,
    pub migration_steps: Vec<MigrationStep>,
    /// `migration_steps` undone in reverse order
    pub rollback_steps: Vec<RollbackStep>,
    pub created_at: DateTime<Utc>,
}

impl MigrationPlan {
    pub(crate) fn new(
        session_id: &str,
        source_coordinator: Option<String>,
        target_coordinator: &str,
    ) -> Self {
        let migration_steps = MigrationStep::ALL.to_vec();
        let rollback_steps = migration_steps
            .iter()
            .rev()
            .map(MigrationStep::rollback)
            .collect();

        Self {
            session_id: session_id.to_string(),
            source_coordinator,
            target_coordinator: target_coordinator.to_string(),
            migration_steps,
            rollback_steps,
            created_at: Utc::now(),
        }
    }

    /// Rollback steps needed after the first `applied` forward steps succeeded
    pub fn rollback_after(&self, applied: usize) -> &[RollbackStep] {
        let applied = applied.min(self.migration_steps.len());
        &self.rollback_steps[self.rollback_steps.len() - applied..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_has_six_steps_each_way() {
        let plan = MigrationPlan::new("s1", None, "c2");
        assert_eq!(plan.migration_steps.len(), 6);
        assert_eq!(plan.rollback_steps.len(), 6);
        assert_eq!(plan.migration_steps[0], MigrationStep::PauseSource);
        assert_eq!(plan.migration_steps[5], MigrationStep::VerifyConsistency);
    }

    #[test]
    fn test_rollback_mirrors_forward_steps() {
        let plan = MigrationPlan::new("s1", Some("c1".to_string()), "c2");

        for (i, step) in plan.migration_steps.iter().enumerate() {
            assert_eq!(plan.rollback_steps[5 - i], step.rollback());
        }
        assert_eq!(plan.rollback_steps[0], RollbackStep::DiscardVerification);
        assert_eq!(plan.rollback_steps[5], RollbackStep::ResumeSource);
    }

    #[test]
    fn test_rollback_after_partial_application() {
        let plan = MigrationPlan::new("s1", None, "c2");

        assert!(plan.rollback_after(0).is_empty());
        assert_eq!(
            plan.rollback_after(2),
            &[RollbackStep::DiscardSnapshot, RollbackStep::ResumeSource]
        );
        assert_eq!(plan.rollback_after(99).len(), 6);
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for step in MigrationStep::ALL {
            assert!(seen.insert(step.description()));
            assert!(seen.insert(step.rollback().description()));
        }
    }

    #[test]
    fn test_plan_serialization() {
        let plan = MigrationPlan::new("s1", None, "c2");
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["targetCoordinator"], "c2");
        assert_eq!(json["migrationSteps"][0], "pause_source");
        assert_eq!(json["rollbackSteps"][5], "resume_source");
    }
}
