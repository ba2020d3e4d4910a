//! Session Core
//!
//! Error handling, configuration and logging setup shared by the session
//! store, registry and coordination crates.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{load_config, load_config_or_default, CoordinatorConfig, StoreBackend};
pub use error::{CoreError, Result};
pub use logging::{init_logging, LogConfig};
