//! File-backed state store keeping a JSON snapshot on disk

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{error::StoreError, store::StateStore, Result};

/// State store persisted to a single JSON file
///
/// Entries live in memory; every mutation rewrites the snapshot file so a
/// restarted process can reopen it. The file is replaced atomically through
/// a sibling temporary file.
///
/// # Example
///
/// ```no_run
/// use session_store::{FileStateStore, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::open("/var/lib/sessions/state.json").await?;
///     store.set("coordination:groups", serde_json::json!({})).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct FileStateStore {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
    path: PathBuf,
}

impl FileStateStore {
    /// Open the snapshot at `path`
    ///
    /// # Behavior
    /// - A missing file starts an empty store; the file is written on the
    ///   first mutation
    /// - Parent directories are created on demand
    ///
    /// # Errors
    /// - Returns error if the file exists but is not a JSON object
    /// - Returns error if the file cannot be read
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, Value>>(&bytes).map_err(|e| {
                StoreError::storage(format!(
                    "Corrupt state snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Opened state snapshot {} ({} keys)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            path,
        })
    }

    /// Get the path to the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current number of keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Write the snapshot; caller holds the write lock so writes serialize
    async fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::storage(format!(
                        "Failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                tracing::info!("Created state directory: {}", parent.display());
            }
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await?;
        tracing::trace!("Persisted key {} to {}", key, self.path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(&entries).await?;
        Ok(true)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // BTreeMap iterates in key order
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        assert!(store.is_empty().await);
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store
            .set("coordination:failover", json!({"s1": {"threshold": 3}}))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStateStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("coordination:failover").await.unwrap(),
            Some(json!({"s1": {"threshold": 3}}))
        );
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store.set("k", json!(1)).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_delete_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).await.unwrap();
        store.set("k", json!(1)).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());

        let reopened = FileStateStore::open(&path).await.unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"[1, 2, 3").unwrap();

        let result = FileStateStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Storage(_))));
    }

    #[tokio::test]
    async fn test_keys_with_prefix_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json"))
            .await
            .unwrap();

        store.set("ns:session:b", json!(1)).await.unwrap();
        store.set("ns:session:a", json!(1)).await.unwrap();
        store.set("other", json!(1)).await.unwrap();

        let keys = store.keys_with_prefix("ns:").await.unwrap();
        assert_eq!(keys, vec!["ns:session:a", "ns:session:b"]);
    }
}
