//! In-memory state store using DashMap

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{error::StoreError, store::StateStore, Result};

/// In-memory state store using a concurrent HashMap
///
/// Cloning yields another handle to the same entries. Entries are lost when
/// the process exits.
///
/// # Example
///
/// ```
/// use session_store::{InMemoryStateStore, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStateStore::new();
///     store.set("key", serde_json::json!({"ready": true})).await?;
///     assert!(store.get("key").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryStateStore {
    entries: Arc<DashMap<String, Value>>,
    /// Keys currently stored; reserved before a new key is inserted
    occupied: Arc<AtomicUsize>,
    /// Maximum number of keys to store
    max_capacity: Option<usize>,
}

impl InMemoryStateStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            occupied: Arc::new(AtomicUsize::new(0)),
            max_capacity: None,
        }
    }

    /// Create a new in-memory store with a key limit
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            occupied: Arc::new(AtomicUsize::new(0)),
            max_capacity: Some(max_capacity),
        }
    }

    /// Get the current number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Claim room for one new key; false once the limit is reached
    ///
    /// Called with the key's shard locked, so it must not touch `entries`.
    fn try_reserve_slot(&self) -> bool {
        match self.max_capacity {
            Some(max) => self
                .occupied
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < max).then_some(n + 1)
                })
                .is_ok(),
            None => {
                self.occupied.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        // Overwrites never grow the store
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
            }
            Entry::Vacant(entry) => {
                if !self.try_reserve_slot() {
                    return Err(StoreError::CapacityExceeded);
                }
                entry.insert(value);
            }
        }
        tracing::trace!("Stored key: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.occupied.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStateStore::new();
        let value = json!({"members": ["w1", "w2"], "nested": {"depth": 2}});

        store.set("group:g1", value.clone()).await.unwrap();
        assert_eq!(store.get("group:g1").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryStateStore::new();
        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStateStore::new();
        store.set("k", json!("v")).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = InMemoryStateStore::new();
        store.set("session:b", json!(1)).await.unwrap();
        store.set("session:a", json!(1)).await.unwrap();
        store.set("group:a", json!(1)).await.unwrap();

        let keys = store.keys_with_prefix("session:").await.unwrap();
        assert_eq!(keys, vec!["session:a".to_string(), "session:b".to_string()]);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let store = InMemoryStateStore::with_capacity(2);

        store.set("k1", json!(1)).await.unwrap();
        store.set("k2", json!(2)).await.unwrap();
        // Overwriting an existing key is still allowed
        store.set("k1", json!(3)).await.unwrap();

        let result = store.set("k3", json!(4)).await;
        assert!(matches!(result, Err(StoreError::CapacityExceeded)));
    }

    #[tokio::test]
    async fn test_delete_frees_capacity() {
        let store = InMemoryStateStore::with_capacity(1);

        store.set("k1", json!(1)).await.unwrap();
        assert!(store.set("k2", json!(2)).await.is_err());

        assert!(store.delete("k1").await.unwrap());
        store.set("k2", json!(2)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_respect_capacity() {
        let store = Arc::new(InMemoryStateStore::with_capacity(5));
        let mut handles = vec![];

        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(&format!("key-{}", i), json!(i)).await.is_ok()
            }));
        }

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap() {
                stored += 1;
            }
        }

        assert_eq!(stored, 5);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = InMemoryStateStore::new();
        let handle = store.clone();

        handle.set("shared", json!(true)).await.unwrap();
        assert_eq!(store.get("shared").await.unwrap(), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let store = Arc::new(InMemoryStateStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("session-{}", i);
                store.set(&key, json!(i)).await.unwrap();
                store.get(&key).await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 10);
    }
}
