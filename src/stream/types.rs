//! Stream consumer types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type returned by user callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by user callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// Errors raised while consuming a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Malformed input that is logged and skipped; never ends a stream.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The open hook rejected the response before any byte was read.
    #[error("Response rejected: {0}")]
    Validation(String),

    /// Reading the body failed.
    #[error("Body error: {0}")]
    Body(String),

    /// A message callback failed.
    #[error("Callback error: {0}")]
    Callback(String),
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// One decoded event-stream message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub id: String,
    pub event: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
}

/// How a consumer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The body ended.
    Finished,
    /// The cancellation token fired.
    Aborted,
    /// An error was handed to the error callback.
    Errored,
}

/// Decoding mode of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Event-stream framing.
    #[default]
    Events,
    /// Raw UTF-8 text.
    Text,
    /// Event-stream framing with typed JSON frames as data.
    Frames,
}

impl StreamMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamMode::Events => "events",
            StreamMode::Text => "text",
            StreamMode::Frames => "frames",
        }
    }
}
