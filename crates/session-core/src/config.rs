//! Configuration management
//!
//! Configuration is loaded from, in increasing precedence:
//! - Default values
//! - A configuration file (TOML, JSON, YAML by extension)
//! - Environment variables prefixed with `SESSIONS`, nested with `__`
//!   (e.g. `SESSIONS__STORE__PATH=/var/lib/sessions.json`)

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SESSIONS";

/// Main configuration for a coordinator process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// State store backend selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Coordination engine settings
    #[serde(default)]
    pub coordination: CoordinationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Which state store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory only
    #[default]
    Memory,
    /// JSON snapshot file
    File,
    /// Memory in front of a snapshot file
    Layered,
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StoreBackend,

    /// Snapshot file, required by the `file` and `layered` backends
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Snapshot path for file-backed stores
    pub fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            CoreError::config(format!(
                "store backend {:?} requires `store.path`",
                self.backend
            ))
        })
    }
}

/// Coordination engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Prefix for every key the engine writes to the state store
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Group status value counted as active in statistics
    #[serde(default = "default_active_status")]
    pub active_status: String,

    /// Failure threshold used when a caller does not pick one
    #[serde(default = "default_failover_threshold")]
    pub default_failover_threshold: u32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            active_status: default_active_status(),
            default_failover_threshold: default_failover_threshold(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_namespace() -> String {
    "coordination".to_string()
}

fn default_active_status() -> String {
    "active".to_string()
}

fn default_failover_threshold() -> u32 {
    3
}

/// Load configuration from a file
///
/// # Example
///
/// ```no_run
/// use session_core::config::load_config;
///
/// let config = load_config("sessions.toml").unwrap();
/// println!("namespace: {}", config.coordination.namespace);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CoordinatorConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CoreError::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let config: CoordinatorConfig = settings.try_deserialize()?;

    tracing::info!("Configuration loaded from {}", path.display());

    Ok(config)
}

/// Load configuration with defaults if the file is missing or invalid
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> CoordinatorConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            CoordinatorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.coordination.namespace, "coordination");
        assert_eq!(config.coordination.active_status, "active");
        assert_eq!(config.coordination.default_failover_threshold, 3);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "logging": { "level": "debug", "json": true },
            "store": { "backend": "file", "path": "/tmp/sessions.json" },
            "coordination": { "namespace": "team-a" }
        }"#;

        let config: CoordinatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.coordination.namespace, "team-a");
        // Unset fields keep their defaults
        assert_eq!(config.coordination.active_status, "active");
    }

    #[test]
    fn test_require_path() {
        let config = StoreConfig {
            backend: StoreBackend::File,
            path: None,
        };
        assert!(matches!(config.require_path(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[store]\nbackend = \"layered\"\npath = \"/tmp/state.json\"\n\n[coordination]\ndefault_failover_threshold = 5"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Layered);
        assert_eq!(config.coordination.default_failover_threshold, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = load_config_or_default("nonexistent.toml");
        assert_eq!(config.coordination.namespace, "coordination");
    }
}
