//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; without one, updates are no-ops
//! - The codegen binary installs the fmt subscriber through `init_logging`

pub mod logging;
pub mod metrics;
