//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WirecallConfig (validated, immutable)
//!
//! Request layers:
//!     defaults.rs (process-wide, ArcSwap)
//!     → per-instance (dispatcher)
//!     → argument-derived (per call)
//!     → call-site options
//!     = merged RequestConfig (fresh per call)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → atomic swap of the default layer
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Layers are merged into a new value; no layer is mutated in place

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use defaults::{
    default_request_config, global_context, new_context, set_default_request_config,
    DefaultContext,
};
pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{CodegenConfig, ObservabilityConfig, RequestConfig, SocketConfig, WirecallConfig};
pub use watcher::ConfigWatcher;
