//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and their schemes
//! - Validate value ranges (timeouts > 0)
//! - Check header names and glob patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WirecallConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{CodegenConfig, RequestConfig, SocketConfig, WirecallConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a full configuration.
pub fn validate_config(config: &WirecallConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_request(&config.request, "request", &mut errors);
    validate_socket(&config.socket, &mut errors);
    validate_codegen(&config.codegen, &mut errors);

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one request layer. `scope` prefixes field paths.
pub fn validate_request(config: &RequestConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    if let Some(base_url) = &config.base_url {
        match url::Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                format!("{scope}.base_url"),
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                format!("{scope}.base_url"),
                format!("invalid URL: {e}"),
            )),
        }
    }

    if config.timeout_ms == Some(0) {
        errors.push(ValidationError::new(
            format!("{scope}.timeout_ms"),
            "must be greater than zero",
        ));
    }

    for (name, value) in &config.headers {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("{scope}.headers"),
                format!("invalid header name '{name}'"),
            ));
        }
        if reqwest::header::HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("{scope}.headers.{name}"),
                "invalid header value",
            ));
        }
    }
}

fn validate_socket(config: &SocketConfig, errors: &mut Vec<ValidationError>) {
    if let Some(url) = &config.url {
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "ws" | "wss") => {}
            Ok(parsed) => errors.push(ValidationError::new(
                "socket.url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("socket.url", format!("invalid URL: {e}"))),
        }
    }

    if config.ack_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "socket.ack_timeout_ms",
            "must be greater than zero",
        ));
    }

    if config.send_buffer == 0 {
        errors.push(ValidationError::new(
            "socket.send_buffer",
            "must be greater than zero",
        ));
    }
}

fn validate_codegen(config: &CodegenConfig, errors: &mut Vec<ValidationError>) {
    if config.include.is_empty() {
        errors.push(ValidationError::new(
            "codegen.include",
            "at least one pattern is required",
        ));
    }

    for (field, patterns) in [("codegen.include", &config.include), ("codegen.exclude", &config.exclude)] {
        for pattern in patterns {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(field, format!("bad pattern '{pattern}': {e}")));
            }
        }
    }

    if config.runtime_path.trim().is_empty() {
        errors.push(ValidationError::new("codegen.runtime_path", "must not be empty"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WirecallConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = WirecallConfig::default();
        config.request.base_url = Some("ftp://example.com".into());
        config.request.timeout_ms = Some(0);
        config.socket.ack_timeout_ms = 0;
        config.codegen.include = vec!["src/[".into()];
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "request.base_url",
                "request.timeout_ms",
                "socket.ack_timeout_ms",
                "codegen.include",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_invalid_header_name() {
        let mut errors = Vec::new();
        let config = RequestConfig::new().with_header("bad header", "v");
        validate_request(&config, "call", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "call.headers: invalid header name 'bad header'");
    }
}
