//! Coordination statistics for reporting

use serde::Serialize;

/// Snapshot of engine table sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationStats {
    /// Sessions with a dependency record
    pub total_dependencies: usize,
    pub total_groups: usize,
    /// Groups whose status equals the configured active status
    pub active_groups: usize,
    pub failover_configs: usize,
}
