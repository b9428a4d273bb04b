//! Endpoint contracts and stubs.
//!
//! # Data Flow
//! ```text
//! ServiceDescriptor
//!     → compiler.rs (path join, position-indexed bindings)
//!     → EndpointContract (immutable, shared via Arc)
//!     → stub.rs (closure table keyed by method id)
//!     → dispatcher (http / socket)
//! ```
//!
//! # Design Decisions
//! - Contracts are created at build time and read-only afterwards
//! - Stubs never reorder or name-match arguments

pub mod args;
pub mod compiler;
pub mod stub;
pub mod types;

pub use args::{Argument, FilePart};
pub use compiler::{compile_all, compile_method, compile_service, join_path};
pub use stub::{contracts_from_json, InvokeFn, Stub, StubTable};
pub use types::{
    BindingKind, EndpointContract, FileFieldInfo, FileUploadSpec, ParameterBinding, ReturnShape,
    UploadShape, Verb,
};
