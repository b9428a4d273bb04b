//! Streaming response decoding.
//!
//! # Data Flow
//! ```text
//! body chunks (Bytes)
//!     → lines.rs (rolling buffer, \r \n \r\n)
//!     → event.rs (fields → StreamMessage, id, retry)
//!     → consumer.rs (sentinel filter, raw / JSON / frame callbacks)
//!
//! text mode:
//!     body chunks → text.rs (streaming UTF-8) → on_text
//! ```

pub mod consumer;
pub mod event;
pub mod frames;
pub mod lines;
pub mod text;
pub mod types;

pub use consumer::StreamConsumer;
pub use event::{EventParser, LineEvent, DONE_SENTINEL};
pub use frames::DataFrame;
pub use lines::LineSplitter;
pub use text::Utf8Decoder;
pub use types::{
    CallbackError, CallbackResult, StreamError, StreamMessage, StreamMode, StreamOutcome,
    StreamResult,
};
