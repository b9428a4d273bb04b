//! Code generation errors and reports.

use std::path::PathBuf;
use thiserror::Error;

use crate::descriptor::DescriptorError;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for code generation.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// A member skipped in one source unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMember {
    pub file: PathBuf,
    pub error: DescriptorError,
}

/// Summary of one generation run.
#[derive(Debug, Clone, Default)]
pub struct CodegenReport {
    pub files_scanned: usize,
    pub services: usize,
    pub contracts: usize,
    pub skipped: Vec<SkippedMember>,
    /// Written files, in write order.
    pub outputs: Vec<PathBuf>,
}
