//! Configuration schema definitions.
//!
//! This module defines the configuration structure for dispatchers and the
//! code generator. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::contract::Verb;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct WirecallConfig {
    /// Request settings used as the process-wide default layer.
    pub request: RequestConfig,

    /// Socket dispatch settings.
    pub socket: SocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Stub generation settings.
    pub codegen: CodegenConfig,
}

/// One layer of request configuration.
///
/// The same shape is used for the process-wide default, the per-instance
/// layer and call-site options. Maps merge key-wise; scalars override.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RequestConfig {
    /// Base URL the path template is appended to (e.g., "https://api.example.com").
    pub base_url: Option<String>,

    /// Verb override.
    pub method: Option<Verb>,

    /// Extra headers. Names compare case-insensitively.
    pub headers: BTreeMap<String, String>,

    /// Extra query parameters.
    pub query: BTreeMap<String, String>,

    /// Total request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_method(mut self, method: Verb) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Layer `over` on top of `self` and return the result.
    ///
    /// Neither input is modified.
    pub fn merged_with(&self, over: &RequestConfig) -> RequestConfig {
        let mut headers = BTreeMap::new();
        for (name, value) in self.headers.iter().chain(over.headers.iter()) {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let mut query = self.query.clone();
        query.extend(over.query.iter().map(|(k, v)| (k.clone(), v.clone())));

        RequestConfig {
            base_url: over.base_url.clone().or_else(|| self.base_url.clone()),
            method: over.method.or(self.method),
            headers,
            query,
            timeout_ms: over.timeout_ms.or(self.timeout_ms),
        }
    }

    /// Merge layers from lowest to highest precedence.
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a RequestConfig>) -> RequestConfig {
        layers
            .into_iter()
            .fold(RequestConfig::default(), |acc, layer| acc.merged_with(layer))
    }
}

/// Socket dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SocketConfig {
    /// WebSocket endpoint (e.g., "ws://localhost:3000/chat").
    pub url: Option<String>,

    /// How long to wait for an acknowledgement, in milliseconds.
    pub ack_timeout_ms: u64,

    /// Outbound frame queue capacity.
    pub send_buffer: usize,
}

impl SocketConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: None,
            ack_timeout_ms: 30_000,
            send_buffer: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Stub generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodegenConfig {
    /// Directory scanned for source units.
    pub root: String,

    /// Glob patterns (relative to root) selecting source units.
    pub include: Vec<String>,

    /// Glob patterns excluded even when included.
    pub exclude: Vec<String>,

    /// Output directory for generated files.
    pub out_dir: String,

    /// Crate path the generated stubs import their runtime from.
    pub runtime_path: String,

    /// File name of the compiled contract list.
    pub contracts_file: String,

    /// File name of the generated stub module.
    pub stubs_file: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            include: vec![
                "**/*.controller.ts".to_string(),
                "**/*.gateway.ts".to_string(),
                "**/*.endpoints.toml".to_string(),
            ],
            exclude: vec!["**/node_modules/**".to_string()],
            out_dir: "generated".to_string(),
            runtime_path: "wirecall".to_string(),
            contracts_file: "contracts.json".to_string(),
            stubs_file: "stubs.rs".to_string(),
        }
    }
}
