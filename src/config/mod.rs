//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → hot subset applied through settings.rs (arc-swap cell)
//!     → requests processed afterwards observe new values
//! ```
//!
//! Startup config is immutable; only the subset in [`settings::RuntimeSettings`]
//! (and the geo rule set) is applied live.

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;
pub use settings::{RuntimeSettings, SettingsCell};
