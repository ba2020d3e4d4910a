//! Session coordination
//!
//! This crate lets registered sessions share state, wait on one another,
//! collaborate in groups, plan migrations between coordinators and fail
//! over to backups. All of it runs through the [`SessionCoordinator`].

pub mod coordinator;
pub mod dependency;
pub mod error;
pub mod failover;
pub mod group;
pub mod migration;
pub mod settings;
pub mod stats;

// Re-exports
pub use coordinator::{SessionCoordinator, SharedEntry};
pub use dependency::{DependencyChain, DependencyEntry, DependencyRecord, DependencyState};
pub use error::{CoordinationError, Result};
pub use failover::{BackupSelector, FailoverConfig, FailureOutcome, FirstAvailable};
pub use group::{SessionGroup, TERMINAL_GROUP_STATUSES};
pub use migration::{MigrationPlan, MigrationStep, RollbackStep};
pub use settings::CoordinationSettings;
pub use stats::CoordinationStats;
