//! Inter-session dependency tracking
//!
//! A dependent session can start once every one of its direct dependencies
//! has been explicitly marked [`DependencyState::Completed`]. State is never
//! derived transitively: completing A unblocks sessions that list A, not
//! sessions that list A's own dependents.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Recorded state of one dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyState {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// A dependency and its recorded state within one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEntry {
    pub session_id: String,
    pub state: DependencyState,
}

/// Dependencies registered for one dependent session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    /// In registration order, without duplicates
    pub dependencies: Vec<DependencyEntry>,
    pub registered_at: DateTime<Utc>,
}

impl DependencyRecord {
    fn new<I, S>(dependency_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let dependencies = dependency_ids
            .into_iter()
            .map(Into::<String>::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .map(|session_id| DependencyEntry {
                session_id,
                state: DependencyState::Pending,
            })
            .collect();

        Self {
            dependencies,
            registered_at: Utc::now(),
        }
    }

    fn can_start(&self) -> bool {
        self.dependencies
            .iter()
            .all(|entry| entry.state == DependencyState::Completed)
    }
}

/// Result of [`SessionCoordinator::get_dependency_chain`](crate::SessionCoordinator::get_dependency_chain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyChain {
    pub session_id: String,
    pub dependencies: Vec<DependencyEntry>,
    pub can_start: bool,
}

/// Forward table plus reverse index
///
/// `dependents` maps a dependency id to every session whose record lists
/// it, so a state update touches only the records that reference it.
#[derive(Default)]
pub(crate) struct DependencyTable {
    records: DashMap<String, DependencyRecord>,
    dependents: DashMap<String, BTreeSet<String>>,
}

impl DependencyTable {
    pub fn from_records(records: BTreeMap<String, DependencyRecord>) -> Self {
        let table = Self::default();
        for (session_id, record) in records {
            table.index(&session_id, &record);
            table.records.insert(session_id, record);
        }
        table
    }

    /// Create or replace the record for `session_id`
    pub fn register<I, S>(&self, session_id: &str, dependency_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = DependencyRecord::new(dependency_ids);
        self.index(session_id, &record);

        if let Some(previous) = self.records.insert(session_id.to_string(), record) {
            self.unindex_stale(session_id, &previous);
        }
    }

    /// Set `state` for `dependency_id` in every record that lists it
    ///
    /// # Returns
    /// Number of dependent records updated
    pub fn update(&self, dependency_id: &str, state: DependencyState) -> usize {
        let dependents: Vec<String> = match self.dependents.get(dependency_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return 0,
        };

        let mut updated = 0;
        for dependent in dependents {
            if let Some(mut record) = self.records.get_mut(&dependent) {
                for entry in record
                    .dependencies
                    .iter_mut()
                    .filter(|entry| entry.session_id == dependency_id)
                {
                    entry.state = state;
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Chain for `session_id`; a session without a record has no blockers
    pub fn chain(&self, session_id: &str) -> DependencyChain {
        match self.records.get(session_id) {
            Some(record) => DependencyChain {
                session_id: session_id.to_string(),
                dependencies: record.dependencies.clone(),
                can_start: record.can_start(),
            },
            None => DependencyChain {
                session_id: session_id.to_string(),
                dependencies: Vec::new(),
                can_start: true,
            },
        }
    }

    /// Sessions whose record lists `dependency_id`, sorted
    pub fn dependents_of(&self, dependency_id: &str) -> Vec<String> {
        self.dependents
            .get(dependency_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, DependencyRecord> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn index(&self, session_id: &str, record: &DependencyRecord) {
        for entry in &record.dependencies {
            self.dependents
                .entry(entry.session_id.clone())
                .or_default()
                .insert(session_id.to_string());
        }
    }

    /// Drop reverse entries the replacement record no longer carries
    fn unindex_stale(&self, session_id: &str, previous: &DependencyRecord) {
        let current: BTreeSet<String> = self
            .records
            .get(session_id)
            .map(|record| {
                record
                    .dependencies
                    .iter()
                    .map(|entry| entry.session_id.clone())
                    .collect()
            })
            .unwrap_or_default();

        for entry in &previous.dependencies {
            if current.contains(&entry.session_id) {
                continue;
            }
            if let Some(mut set) = self.dependents.get_mut(&entry.session_id) {
                set.remove(session_id);
            }
            self.dependents
                .remove_if(&entry.session_id, |_, set| set.is_empty());
        }
    }
}
