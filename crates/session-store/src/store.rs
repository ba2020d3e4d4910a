//! State store trait definition

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::Result;

/// Process-wide key/value store
///
/// Values are opaque JSON documents. Writes are last-write-wins with no
/// versioning, and there are no cross-key transactions.
///
/// Implementations:
/// - [`InMemoryStateStore`](crate::InMemoryStateStore) for process lifetime
/// - [`FileStateStore`](crate::FileStateStore) for a JSON snapshot on disk
/// - [`LayeredStateStore`](crate::LayeredStateStore) to stack the two
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was written
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`
    ///
    /// # Returns
    /// true if a value was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List keys starting with `prefix`, sorted
    ///
    /// Intended for inspection tooling.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Get the name of this store (for debugging/logging)
    fn name(&self) -> &str;
}

/// Typed access on top of [`StateStore`]
///
/// Blanket-implemented for every store, including `dyn StateStore`.
#[async_trait]
pub trait StateStoreExt: StateStore {
    /// Read and deserialize the value under `key`
    async fn get_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    async fn set_as<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}
