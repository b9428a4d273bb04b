//! wirecall: contract-driven remote call stubs.
//!
//! Decorated service classes are read into descriptors, compiled into
//! immutable endpoint contracts, and replayed at runtime as HTTP requests or
//! socket events. Streaming responses are decoded incrementally.

// Build time
pub mod codegen;
pub mod contract;
pub mod descriptor;

// Runtime
pub mod http;
pub mod socket;
pub mod stream;

// Cross-cutting concerns
pub mod config;
pub mod observability;

/// Entry point imported by generated stubs.
pub mod prelude {
    pub use crate::config::{RequestConfig, SocketConfig};
    pub use crate::contract::{contracts_from_json, Argument, EndpointContract, FilePart, Verb};
    pub use crate::http::{
        DispatchError, DispatchResult, HttpDispatcher, HttpStubTable, ResponseHandle,
    };
    pub use crate::socket::{
        EventDispatcher, EventOptions, EventStubTable, SocketError, SocketResult,
    };
    pub use crate::stream::{DataFrame, StreamConsumer, StreamMessage, StreamOutcome};
    pub use serde_json::{Error as JsonError, Value};
}

pub use config::WirecallConfig;
pub use contract::{EndpointContract, StubTable};
pub use http::HttpDispatcher;
pub use socket::EventDispatcher;
pub use stream::StreamConsumer;
