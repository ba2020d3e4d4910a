//! Session coordination engine
//!
//! Built on a [`StateStore`] and a [`SessionRegistry`]. Every mutating call
//! updates the in-memory tables first and then mirrors the affected table
//! into the store, so a restarted process can [`SessionCoordinator::restore`]
//! them. Table locks are never held across a store call: each operation
//! validates and mutates without suspending. Snapshot writes of one table
//! are serialized by a per-table persist lock, so the stored copy is always
//! taken after every mutation that preceded it. Point-to-point shared values
//! are separate keys and are last-write-wins.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use session_registry::SessionRegistry;
use session_store::{StateStore, StateStoreExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dependency::{DependencyChain, DependencyRecord, DependencyState, DependencyTable};
use crate::failover::{BackupSelector, FailoverConfig, FailureOutcome, FirstAvailable};
use crate::group::SessionGroup;
use crate::migration::MigrationPlan;
use crate::settings::CoordinationSettings;
use crate::stats::CoordinationStats;
use crate::{CoordinationError, Result};

/// Value written by [`SessionCoordinator::share_state`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedEntry {
    pub value: Value,
    pub from_session: String,
    pub shared_at: DateTime<Utc>,
}

/// Coordinates sessions that share data, wait on each other, work in
/// groups and move between coordinators
///
/// Construct one per process and hand out `Arc<SessionCoordinator>`.
///
/// # Example
///
/// ```
/// use session_coordination::SessionCoordinator;
/// use session_registry::SessionRegistry;
/// use session_store::InMemoryStateStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = SessionRegistry::new();
///     registry.initialize_session("planner").unwrap();
///     registry.initialize_session("coder").unwrap();
///
///     let coordinator = SessionCoordinator::new(Arc::new(InMemoryStateStore::new()), registry);
///
///     assert!(coordinator.share_state("planner", "coder", "plan", &"step 1").await);
///     assert!(!coordinator.share_state("planner", "ghost", "plan", &"step 1").await);
/// }
/// ```
pub struct SessionCoordinator {
    store: Arc<dyn StateStore>,
    registry: SessionRegistry,
    settings: CoordinationSettings,
    selector: Arc<dyn BackupSelector>,
    dependencies: DependencyTable,
    groups: DashMap<String, SessionGroup>,
    failover: DashMap<String, FailoverConfig>,
    /// session -> coordinator currently responsible for it
    assignments: DashMap<String, String>,
    /// Consecutive coordinator failures; not persisted
    failures: DashMap<String, u32>,
    persist_locks: PersistLocks,
}

/// Held from taking a table snapshot until the store write returns
#[derive(Default)]
struct PersistLocks {
    dependencies: Mutex<()>,
    groups: Mutex<()>,
    failover: Mutex<()>,
    assignments: Mutex<()>,
}

impl SessionCoordinator {
    /// Create an engine with empty tables and default settings
    pub fn new(store: Arc<dyn StateStore>, registry: SessionRegistry) -> Self {
        Self::with_settings(store, registry, CoordinationSettings::default())
    }

    /// Create an engine with empty tables
    pub fn with_settings(
        store: Arc<dyn StateStore>,
        registry: SessionRegistry,
        settings: CoordinationSettings,
    ) -> Self {
        Self {
            store,
            registry,
            settings,
            selector: Arc::new(FirstAvailable),
            dependencies: DependencyTable::default(),
            groups: DashMap::new(),
            failover: DashMap::new(),
            assignments: DashMap::new(),
            failures: DashMap::new(),
            persist_locks: PersistLocks::default(),
        }
    }

    /// Rehydrate dependency, group, failover and assignment tables from `store`
    ///
    /// Missing keys start empty tables.
    ///
    /// # Errors
    /// - Returns error if the store fails or a snapshot does not deserialize
    pub async fn restore(
        store: Arc<dyn StateStore>,
        registry: SessionRegistry,
        settings: CoordinationSettings,
    ) -> Result<Self> {
        let keys = settings.keys();

        let dependencies: BTreeMap<String, DependencyRecord> =
            load_table(store.as_ref(), &keys.dependencies()).await?;
        let groups: BTreeMap<String, SessionGroup> =
            load_table(store.as_ref(), &keys.groups()).await?;
        let failover: BTreeMap<String, FailoverConfig> =
            load_table(store.as_ref(), &keys.failover()).await?;
        let assignments: BTreeMap<String, String> =
            load_table(store.as_ref(), &keys.assignments()).await?;

        tracing::info!(
            dependencies = dependencies.len(),
            groups = groups.len(),
            failover = failover.len(),
            "Restored coordination state from {} store",
            store.name()
        );

        let mut coordinator = Self::with_settings(store, registry, settings);
        coordinator.dependencies = DependencyTable::from_records(dependencies);
        coordinator.groups = groups.into_iter().collect();
        coordinator.failover = failover.into_iter().collect();
        coordinator.assignments = assignments.into_iter().collect();
        Ok(coordinator)
    }

    /// Replace the backup selection policy (default: [`FirstAvailable`])
    pub fn with_backup_selector<B: BackupSelector + 'static>(mut self, selector: B) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// The registry this engine validates against
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &CoordinationSettings {
        &self.settings
    }

    fn session_exists(&self, session_id: &str) -> bool {
        self.registry.get_session_status(session_id).is_some()
    }

    // ---------------------------------------------------------------------
    // State sharing
    // ---------------------------------------------------------------------

    /// Store `value` under `to_session`'s namespace at `key`
    ///
    /// # Returns
    /// false, with nothing written, if either session is unknown or the
    /// store rejects the write
    pub async fn share_state<T>(&self, from_session: &str, to_session: &str, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unserializable value for {}:{}: {}", to_session, key, e);
                return false;
            }
        };
        self.share_value(from_session, to_session, key, value).await
    }

    async fn share_value(&self, from_session: &str, to_session: &str, key: &str, value: Value) -> bool {
        if !self.session_exists(from_session) || !self.session_exists(to_session) {
            tracing::debug!(
                "Share {} -> {} rejected: session not registered",
                from_session,
                to_session
            );
            return false;
        }

        let entry = SharedEntry {
            value,
            from_session: from_session.to_string(),
            shared_at: Utc::now(),
        };

        let store_key = self.settings.keys().shared(to_session, key);
        match self.store.set_as(&store_key, &entry).await {
            Ok(()) => {
                tracing::debug!("Shared {} from {} to {}", key, from_session, to_session);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to share {} to {}: {}", key, to_session, e);
                false
            }
        }
    }

    /// Share `value` with each of `to_sessions` independently
    ///
    /// Not atomic: a failed target does not roll back the others.
    ///
    /// # Returns
    /// Number of targets that received the value
    pub async fn broadcast_state<S, T>(&self, from_session: &str, to_sessions: &[S], key: &str, value: &T) -> usize
    where
        S: AsRef<str>,
        T: Serialize + ?Sized,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unserializable broadcast value for {}: {}", key, e);
                return 0;
            }
        };

        let mut delivered = 0;
        for target in to_sessions {
            if self
                .share_value(from_session, target.as_ref(), key, value.clone())
                .await
            {
                delivered += 1;
            }
        }

        tracing::debug!(
            "Broadcast {} from {}: {}/{} delivered",
            key,
            from_session,
            delivered,
            to_sessions.len()
        );
        delivered
    }

    /// Entry last shared to `session_id` under `key`
    pub async fn get_shared_entry(&self, session_id: &str, key: &str) -> Option<SharedEntry> {
        let store_key = self.settings.keys().shared(session_id, key);
        match self.store.get_as::<SharedEntry>(&store_key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Failed to read shared {} for {}: {}", key, session_id, e);
                None
            }
        }
    }

    /// Value last shared to `session_id` under `key`
    pub async fn get_shared_state(&self, session_id: &str, key: &str) -> Option<Value> {
        self.get_shared_entry(session_id, key)
            .await
            .map(|entry| entry.value)
    }

    /// Typed variant of [`get_shared_state`](Self::get_shared_state)
    pub async fn get_shared_state_as<T: DeserializeOwned>(&self, session_id: &str, key: &str) -> Option<T> {
        let value = self.get_shared_state(session_id, key).await?;
        serde_json::from_value(value).ok()
    }

    // ---------------------------------------------------------------------
    // Dependency management
    // ---------------------------------------------------------------------

    /// Create or replace the dependency record for `session_id`
    ///
    /// Every listed dependency starts `pending`.
    pub async fn register_dependency<I, S>(&self, session_id: &str, dependency_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.register(session_id, dependency_ids);
        tracing::debug!("Registered dependencies for {}", session_id);
        self.persist_dependencies().await;
    }

    /// Record `state` for `dependency_id` in every record that lists it
    ///
    /// # Returns
    /// Number of dependent records updated
    pub async fn update_dependency_state(&self, dependency_id: &str, state: DependencyState) -> usize {
        let updated = self.dependencies.update(dependency_id, state);
        tracing::debug!(
            "Dependency {} -> {:?} ({} dependents)",
            dependency_id,
            state,
            updated
        );
        if updated > 0 {
            self.persist_dependencies().await;
        }
        updated
    }

    /// Direct dependencies of `session_id` and whether it may start
    ///
    /// A session without a record has no blockers and can start.
    pub fn get_dependency_chain(&self, session_id: &str) -> DependencyChain {
        self.dependencies.chain(session_id)
    }

    /// Sessions that list `dependency_id` as a direct dependency
    pub fn dependents_of(&self, dependency_id: &str) -> Vec<String> {
        self.dependencies.dependents_of(dependency_id)
    }

    // ---------------------------------------------------------------------
    // Session groups
    // ---------------------------------------------------------------------

    /// Create a group; an existing group with the same id is replaced
    ///
    /// # Errors
    /// - `InvalidGroup` if `session_ids` is empty or does not contain
    ///   `coordinator_id`
    pub async fn create_session_group<I, S>(&self, group_id: &str, session_ids: I, coordinator_id: &str) -> Result<SessionGroup>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = SessionGroup::new(group_id, session_ids, coordinator_id)?;

        if self
            .groups
            .insert(group_id.to_string(), group.clone())
            .is_some()
        {
            tracing::warn!("Replaced existing session group {}", group_id);
        }
        tracing::debug!(
            "Created group {} with {} members (coordinator {})",
            group_id,
            group.members.len(),
            coordinator_id
        );

        self.persist_groups().await;
        Ok(group)
    }

    /// Set the lifecycle status of a group
    ///
    /// # Returns
    /// false if the group does not exist
    pub async fn update_session_group_state(&self, group_id: &str, status: impl Into<String>) -> bool {
        let status = status.into();
        match self.groups.get_mut(group_id) {
            Some(mut group) => {
                tracing::debug!("Group {} status -> {}", group_id, status);
                group.set_status(status);
            }
            None => return false,
        }

        self.persist_groups().await;
        true
    }

    /// Write `key` into the group's store on behalf of `acting_session_id`
    ///
    /// # Returns
    /// false if the group does not exist, the acting session is not a
    /// member, or the value cannot be serialized
    pub async fn share_group_state<T>(&self, group_id: &str, key: &str, value: &T, acting_session_id: &str) -> bool
    where
        T: Serialize + ?Sized,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unserializable group value for {}:{}: {}", group_id, key, e);
                return false;
            }
        };

        match self.groups.get_mut(group_id) {
            Some(mut group) if group.is_member(acting_session_id) => {
                group.shared_state.insert(key.to_string(), value);
            }
            Some(_) => {
                tracing::debug!(
                    "Non-member {} denied write to group {}",
                    acting_session_id,
                    group_id
                );
                return false;
            }
            None => return false,
        }

        self.persist_groups().await;
        true
    }

    /// Read `key` from the group's store
    pub fn get_group_state(&self, group_id: &str, key: &str) -> Option<Value> {
        self.groups
            .get(group_id)
            .and_then(|group| group.shared_state.get(key).cloned())
    }

    /// Typed variant of [`get_group_state`](Self::get_group_state)
    pub fn get_group_state_as<T: DeserializeOwned>(&self, group_id: &str, key: &str) -> Option<T> {
        serde_json::from_value(self.get_group_state(group_id, key)?).ok()
    }

    pub fn get_session_group(&self, group_id: &str) -> Option<SessionGroup> {
        self.groups.get(group_id).map(|group| group.clone())
    }

    /// Ids of groups `session_id` belongs to, sorted
    pub fn groups_for_session(&self, session_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .groups
            .iter()
            .filter(|group| group.is_member(session_id))
            .map(|group| group.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Remove completed or failed groups whose status has not changed for `max_age`
    ///
    /// # Returns
    /// Number of groups removed
    pub async fn cleanup_completed_groups(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.groups.len();
        self.groups.retain(|_, group| !group.is_expired(cutoff));
        let removed = before.saturating_sub(self.groups.len());

        if removed > 0 {
            tracing::info!("Cleaned up {} finished session groups", removed);
            self.persist_groups().await;
        }
        removed
    }

    // ---------------------------------------------------------------------
    // Migration and failover
    // ---------------------------------------------------------------------

    /// Plan moving `session_id` to `target_coordinator`
    ///
    /// The engine does not execute the plan.
    ///
    /// # Errors
    /// - `SessionNotFound` naming the session if it is not registered
    pub fn plan_migration(&self, session_id: &str, target_coordinator: &str) -> Result<MigrationPlan> {
        if !self.session_exists(session_id) {
            return Err(CoordinationError::session_not_found(session_id));
        }

        let plan = MigrationPlan::new(
            session_id,
            self.current_coordinator(session_id),
            target_coordinator,
        );
        tracing::debug!(
            "Planned migration of {} to {}",
            session_id,
            target_coordinator
        );
        Ok(plan)
    }

    /// Record `coordinator_id` as responsible for `session_id`
    ///
    /// Callers use this after executing a migration plan.
    pub async fn assign_coordinator(&self, session_id: &str, coordinator_id: &str) {
        self.assignments
            .insert(session_id.to_string(), coordinator_id.to_string());
        self.failures.remove(session_id);
        self.persist_assignments().await;
    }

    /// Coordinator currently responsible for `session_id`
    pub fn current_coordinator(&self, session_id: &str) -> Option<String> {
        self.assignments.get(session_id).map(|c| c.clone())
    }

    /// Replace the failover configuration for `session_id`
    ///
    /// A threshold of 0 falls back to the configured default.
    pub async fn configure_failover<I, S>(&self, session_id: &str, backup_coordinators: I, failover_threshold: u32, auto_failover: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let failover_threshold = if failover_threshold == 0 {
            self.settings.default_failover_threshold
        } else {
            failover_threshold
        };

        let config = FailoverConfig {
            backup_coordinators: backup_coordinators
                .into_iter()
                .map(Into::<String>::into)
                .collect(),
            failover_threshold,
            auto_failover,
        };
        tracing::debug!(
            "Configured failover for {}: {} backups, threshold {}",
            session_id,
            config.backup_coordinators.len(),
            failover_threshold
        );

        self.failover.insert(session_id.to_string(), config);
        self.persist_failover().await;
    }

    pub fn failover_config(&self, session_id: &str) -> Option<FailoverConfig> {
        self.failover.get(session_id).map(|config| config.clone())
    }

    /// Move `session_id` to a usable backup coordinator
    ///
    /// # Returns
    /// false if no configuration exists or no backup is registered and active
    pub async fn execute_failover(&self, session_id: &str) -> bool {
        let backups = match self.failover.get(session_id) {
            Some(config) => config.backup_coordinators.clone(),
            None => {
                tracing::debug!("No failover configuration for {}", session_id);
                return false;
            }
        };

        let current = self.current_coordinator(session_id);
        let Some(backup) = self
            .selector
            .select(&backups, current.as_deref(), &self.registry)
        else {
            tracing::warn!("No usable backup coordinator for {}", session_id);
            return false;
        };

        tracing::info!(
            "Failing over {} from {} to {}",
            session_id,
            current.as_deref().unwrap_or("<unassigned>"),
            backup
        );
        self.assign_coordinator(session_id, &backup).await;
        true
    }

    /// Count a failure of `session_id`'s coordinator
    ///
    /// Once consecutive failures reach the threshold and auto-failover is
    /// enabled, failover runs immediately.
    pub async fn record_coordinator_failure(&self, session_id: &str) -> FailureOutcome {
        let Some((threshold, auto_failover)) = self
            .failover
            .get(session_id)
            .map(|config| (config.failover_threshold, config.auto_failover))
        else {
            return FailureOutcome::NotConfigured;
        };

        let consecutive_failures = {
            let mut count = self.failures.entry(session_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if consecutive_failures < threshold {
            return FailureOutcome::Recorded {
                consecutive_failures,
                threshold,
            };
        }

        if auto_failover && self.execute_failover(session_id).await {
            if let Some(coordinator) = self.current_coordinator(session_id) {
                return FailureOutcome::FailedOver { coordinator };
            }
        }

        FailureOutcome::ThresholdReached {
            consecutive_failures,
            auto_failover,
        }
    }

    /// Reset the consecutive failure count for `session_id`
    pub fn record_coordinator_success(&self, session_id: &str) {
        self.failures.remove(session_id);
    }

    /// Consecutive failures recorded since the last success or failover
    pub fn consecutive_failures(&self, session_id: &str) -> u32 {
        self.failures.get(session_id).map(|c| *c).unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Statistics and persistence
    // ---------------------------------------------------------------------

    pub fn get_coordination_stats(&self) -> CoordinationStats {
        let active_status = self.settings.active_status.as_str();
        CoordinationStats {
            total_dependencies: self.dependencies.len(),
            total_groups: self.groups.len(),
            active_groups: self
                .groups
                .iter()
                .filter(|group| group.has_status(active_status))
                .count(),
            failover_configs: self.failover.len(),
        }
    }

    async fn persist_dependencies(&self) {
        let _guard = self.persist_locks.dependencies.lock().await;
        let snapshot = self.dependencies.snapshot();
        self.persist(&self.settings.keys().dependencies(), &snapshot)
            .await;
    }

    async fn persist_groups(&self) {
        let _guard = self.persist_locks.groups.lock().await;
        let snapshot = snapshot_of(&self.groups);
        self.persist(&self.settings.keys().groups(), &snapshot).await;
    }

    async fn persist_failover(&self) {
        let _guard = self.persist_locks.failover.lock().await;
        let snapshot = snapshot_of(&self.failover);
        self.persist(&self.settings.keys().failover(), &snapshot).await;
    }

    async fn persist_assignments(&self) {
        let _guard = self.persist_locks.assignments.lock().await;
        let snapshot = snapshot_of(&self.assignments);
        self.persist(&self.settings.keys().assignments(), &snapshot)
            .await;
    }

    /// Store failures are logged, never surfaced to the caller
    async fn persist<T: Serialize + Sync>(&self, key: &str, snapshot: &T) {
        if let Err(e) = self.store.set_as(key, snapshot).await {
            tracing::warn!("Failed to persist {} to {} store: {}", key, self.store.name(), e);
        }
    }
}

fn snapshot_of<V: Clone>(table: &DashMap<String, V>) -> BTreeMap<String, V> {
    table
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

async fn load_table<V>(store: &dyn StateStore, key: &str) -> Result<BTreeMap<String, V>>
where
    V: DeserializeOwned + Send,
{
    Ok(store
        .get_as::<BTreeMap<String, V>>(key)
        .await?
        .unwrap_or_default())
}
