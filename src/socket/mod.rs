//! Socket event dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! (event contract, args, options)
//!     → payload.rs (body bindings → JSON payload)
//!     → dispatcher.rs (void: emit | otherwise: emit_with_ack + timer)
//!     → transport.rs (WebSocket JSON frames, ack correlation)
//! ```

pub mod dispatcher;
pub mod payload;
pub mod transport;
pub mod types;

pub use dispatcher::{AckHandle, EventCall, EventDispatcher, EventStubTable};
pub use payload::build_payload;
pub use transport::{SocketTransport, WsTransport};
pub use types::{EventOptions, ServerEvent, SocketError, SocketResult};
