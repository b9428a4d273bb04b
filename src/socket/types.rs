//! Socket dispatch types and errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while emitting a socket event.
#[derive(Debug, Error)]
pub enum SocketError {
    /// No acknowledgement arrived in time.
    #[error("No acknowledgement for '{event}' within {timeout:?}")]
    AckTimeout { event: String, timeout: Duration },

    /// The acknowledgement was an `{ "error": "..." }` object.
    #[error("Remote rejected '{event}': {message}")]
    AckPayload { event: String, message: String },

    #[error("Socket transport error: {0}")]
    Transport(String),

    /// The channel closed before the event was sent or acknowledged.
    #[error("Socket closed")]
    Closed,

    /// The contract describes an HTTP endpoint.
    #[error("{0} is an HTTP endpoint, not a socket event")]
    NotEvent(String),
}

/// Result type for socket operations.
pub type SocketResult<T> = Result<T, SocketError>;

/// Per-call options for event dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventOptions {
    /// Overrides the configured acknowledgement timeout.
    pub ack_timeout_ms: Option<u64>,
}

impl EventOptions {
    pub fn with_ack_timeout(timeout: Duration) -> Self {
        Self {
            ack_timeout_ms: Some(timeout.as_millis() as u64),
        }
    }
}

/// Outbound frame written by the WebSocket transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub event: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<String>,
}

/// Inbound frame: either an acknowledgement or a server-sent event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Ack {
        ack: String,
        #[serde(default)]
        data: Value,
    },
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
}

/// Event pushed by the server without a matching request.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}
