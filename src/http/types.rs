//! Outgoing request types and error definitions.

use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::contract::FilePart;

/// Errors that can occur while dispatching an HTTP call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Connection or protocol failure in the HTTP client.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Failure reported by a non-reqwest transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The contract describes a socket event.
    #[error("{0} is a socket event, not an HTTP endpoint")]
    NotHttp(String),

    /// No layer supplied a base URL.
    #[error("No base URL configured for {0}")]
    MissingBaseUrl(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Invalid multipart part '{name}': {reason}")]
    InvalidPart { name: String, reason: String },

    /// Non-2xx status, produced only on request via `error_for_status`.
    #[error("HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Body stream failed mid-read.
    #[error("Body read error: {0}")]
    Body(String),

    /// Body was not the expected JSON.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Value of one multipart field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

/// One multipart field.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file: FilePart) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File(file),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.value, FormValue::File(_))
    }
}

/// Request body as built from the arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    /// File parts of a multipart body.
    pub fn files(&self) -> Vec<&FormPart> {
        match self {
            RequestBody::Multipart(parts) => parts.iter().filter(|p| p.is_file()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Fully resolved request, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: reqwest::Method,

    /// Absolute URL without query string.
    pub url: String,

    /// Query pairs in order; repeated keys allowed.
    pub query: Vec<(String, String)>,

    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,

    pub body: RequestBody,

    pub timeout: Option<Duration>,
}

impl OutgoingRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All values of one query key.
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}
