//! Session Registry
//!
//! Tracks which sessions exist, whether each is active, and how many
//! sub-agents it currently has. Other components treat a `None` lookup as
//! "not currently coordinatable".
//!
//! # Example
//!
//! ```
//! use session_registry::SessionRegistry;
//!
//! let registry = SessionRegistry::new();
//! registry.initialize_session("planner").unwrap();
//!
//! let status = registry.get_session_status("planner").unwrap();
//! assert!(status.active);
//! assert!(registry.get_session_status("unknown").is_none());
//! ```

pub mod error;
pub mod registry;
pub mod session;

// Re-exports
pub use error::{RegistryError, Result};
pub use registry::SessionRegistry;
pub use session::{SessionHandle, SessionStatus};
