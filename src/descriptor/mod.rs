//! Descriptor extraction subsystem.
//!
//! # Data Flow
//! ```text
//! source unit (decorated classes)
//!     → lexer.rs (tokens with line numbers)
//!     → parser.rs (classes, methods, parameters)
//!     → upload.rs (file-upload shape + interceptor cross-check)
//!     → Extraction { services, per-member errors }
//!
//! TOML manifest
//!     → manifest.rs → Vec<ServiceDescriptor>
//! ```
//!
//! # Design Decisions
//! - Output is plain data; nothing here knows about transports
//! - One bad member never fails the file

pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod types;
pub mod upload;

pub use manifest::parse_manifest;
pub use parser::extract_source;
pub use types::{
    DescriptorError, DescriptorResult, Extraction, MethodDescriptor, ParamDescriptor,
    ServiceDescriptor, ServiceKind,
};
