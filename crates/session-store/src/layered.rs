//! Layered state storage with fallback

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{error::StoreError, store::StateStore, Result};

/// Layered store combining multiple storage backends
///
/// Reads check layers in order and write hits back into the faster layers.
/// Writes go to every layer and succeed if at least one layer accepted them.
///
/// Typical usage: Memory → File
///
/// # Example
///
/// ```no_run
/// use session_store::{FileStateStore, InMemoryStateStore, LayeredStateStore, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = LayeredStateStore::new()
///         .with_layer(InMemoryStateStore::new())
///         .with_layer(FileStateStore::open("/tmp/state.json").await?);
///
///     store.set("key", serde_json::json!(1)).await?;
///     Ok(())
/// }
/// ```
pub struct LayeredStateStore {
    /// Storage layers (checked in order for reads)
    layers: Vec<Arc<dyn StateStore>>,
}

impl LayeredStateStore {
    /// Create a new layered store
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a storage layer
    ///
    /// First layer = fastest, last layer = most durable.
    pub fn with_layer<S: StateStore + 'static>(mut self, store: S) -> Self {
        self.layers.push(Arc::new(store));
        self
    }

    /// Get the number of layers
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn ensure_layers(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(StoreError::storage("No storage layers configured"));
        }
        Ok(())
    }
}

impl Default for LayeredStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for LayeredStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_layers()?;

        for (i, layer) in self.layers.iter().enumerate() {
            match layer.get(key).await {
                Ok(Some(value)) => {
                    tracing::trace!("Loaded {} from layer {} ({})", key, i, layer.name());

                    for earlier in self.layers.iter().take(i) {
                        if let Err(e) = earlier.set(key, value.clone()).await {
                            tracing::warn!(
                                "Failed to write-back to layer {}: {}",
                                earlier.name(),
                                e
                            );
                        }
                    }

                    return Ok(Some(value));
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Error reading from layer {}: {}", layer.name(), e);
                    continue;
                }
            }
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_layers()?;

        let mut errors = Vec::new();

        for (i, layer) in self.layers.iter().enumerate() {
            if let Err(e) = layer.set(key, value.clone()).await {
                tracing::warn!("Failed to write to layer {} ({}): {}", i, layer.name(), e);
                errors.push(format!("{}: {}", layer.name(), e));
            }
        }

        if errors.len() == self.layers.len() {
            return Err(StoreError::storage(format!(
                "Failed to write to all layers: {}",
                errors.join("; ")
            )));
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_layers()?;

        let mut removed = false;
        for layer in &self.layers {
            match layer.delete(key).await {
                Ok(true) => removed = true,
                Ok(false) => {}
                Err(e) => tracing::warn!("Error deleting from layer {}: {}", layer.name(), e),
            }
        }

        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut all_keys = BTreeSet::new();

        for layer in &self.layers {
            if let Ok(keys) = layer.keys_with_prefix(prefix).await {
                all_keys.extend(keys);
            }
        }

        Ok(all_keys.into_iter().collect())
    }

    fn name(&self) -> &str {
        "layered"
    }
}
