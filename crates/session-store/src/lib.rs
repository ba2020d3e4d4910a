//! State Store
//!
//! Process-wide key/value storage used by the coordination engine as its
//! durability substrate, with pluggable backends (in-memory, JSON snapshot
//! file, layered).
//!
//! # Example
//!
//! ```
//! use session_store::{InMemoryStateStore, StateStoreExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStateStore::new();
//!
//!     store.set_as("retries", &3u32).await?;
//!     let retries: Option<u32> = store.get_as("retries").await?;
//!     assert_eq!(retries, Some(3));
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file;
pub mod layered;
pub mod memory;
pub mod store;

use session_core::config::{StoreBackend, StoreConfig};
use std::sync::Arc;

// Re-exports
pub use error::{Result, StoreError};
pub use file::FileStateStore;
pub use layered::LayeredStateStore;
pub use memory::InMemoryStateStore;
pub use store::{StateStore, StateStoreExt};

/// Open the backend described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.backend {
        StoreBackend::Memory => Arc::new(InMemoryStateStore::new()),
        StoreBackend::File => Arc::new(FileStateStore::open(config.require_path()?).await?),
        StoreBackend::Layered => Arc::new(
            LayeredStateStore::new()
                .with_layer(InMemoryStateStore::new())
                .with_layer(FileStateStore::open(config.require_path()?).await?),
        ),
    };

    tracing::debug!("Opened {} state store", store.name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn test_open_file_store_requires_path() {
        let config = StoreConfig {
            backend: StoreBackend::File,
            path: None,
        };
        let result = open_store(&config).await;
        assert!(matches!(result, Err(StoreError::CoreError(_))));
    }

    #[tokio::test]
    async fn test_open_layered_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::Layered,
            path: Some(dir.path().join("state.json")),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "layered");
    }
}
