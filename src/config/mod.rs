//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → pools built once, shared via Arc
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → pools rebuilt wholesale
//!     → atomic swap; in-flight requests finish on the old pools
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{BackendConfig, HeaderConfig, ListenerConfig, PoolConfig, ProxyConfig, ProxySettings};
