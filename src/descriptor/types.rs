//! Descriptor records and error definitions.
//!
//! Descriptors are plain data: what the scanner saw on one class, before any
//! normalization. The same schema is accepted from a TOML manifest.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::{BindingKind, FileFieldInfo, FileUploadSpec, ReturnShape, Verb};

/// Kind of annotated class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// HTTP controller.
    #[default]
    Controller,
    /// Socket gateway.
    Gateway,
}

/// One annotated class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,

    #[serde(default)]
    pub kind: ServiceKind,

    /// Path prefix from the class decorator.
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default, rename = "method")]
    pub methods: Vec<MethodDescriptor>,
}

/// One annotated method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,

    pub verb: Verb,

    /// Path suffix, or event name for gateways.
    #[serde(default)]
    pub path: String,

    /// Parameters in declaration order; the index is the argument position.
    #[serde(default, rename = "param")]
    pub params: Vec<ParamDescriptor>,

    #[serde(default)]
    pub upload: Option<FileUploadSpec>,

    #[serde(default)]
    pub returns: ReturnShape,

    /// Declared return type text, if any.
    #[serde(default)]
    pub return_type: Option<String>,
}

/// One method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,

    pub kind: BindingKind,

    #[serde(default)]
    pub key: Option<String>,

    /// Declared type text with whitespace removed.
    #[serde(default)]
    pub type_text: Option<String>,

    #[serde(default)]
    pub file_info: Option<FileFieldInfo>,
}

/// Everything extracted from one source unit.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub services: Vec<ServiceDescriptor>,

    /// Members that were skipped, one error each.
    pub errors: Vec<DescriptorError>,
}

impl Extraction {
    pub fn method_count(&self) -> usize {
        self.services.iter().map(|s| s.methods.len()).sum()
    }
}

/// Errors raised while reading annotations. Each one only skips its member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Decorator present but its argument shape is not understood.
    #[error("line {line}: unsupported @{decorator} on {member}")]
    UnsupportedDecorator {
        member: String,
        decorator: String,
        line: usize,
    },

    /// A path or key argument is not a string literal.
    #[error("line {line}: @{decorator} on {member} expects a string literal")]
    NonLiteralArgument {
        member: String,
        decorator: String,
        line: usize,
    },

    /// Token stream could not be parsed.
    #[error("line {line}: syntax error: {message}")]
    Syntax { line: usize, message: String },

    /// Structured manifest could not be read.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A service with this name was already found in another source unit.
    #[error("duplicate service {service}")]
    DuplicateService { service: String },
}

/// Result type for descriptor operations.
pub type DescriptorResult<T> = Result<T, DescriptorError>;
