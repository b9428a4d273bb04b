//! Build-time stub generation.
//!
//! # Data Flow
//! ```text
//! CodegenConfig (root, include/exclude globs)
//!     → scan.rs (walkdir + globset, per-file front end)
//!     → contract::compile_all
//!     → out_dir/contracts.json
//!     → render.rs → out_dir/stubs.rs
//! ```

pub mod render;
pub mod scan;
pub mod types;

use std::path::{Path, PathBuf};

pub use render::render_module;
pub use scan::{scan, ScanOutput};
pub use types::{CodegenError, CodegenReport, CodegenResult, SkippedMember};

use crate::config::schema::CodegenConfig;
use crate::contract::compile_all;

fn write_file(path: PathBuf, content: &str) -> CodegenResult<PathBuf> {
    std::fs::write(&path, content).map_err(|source| CodegenError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Wrote generated file");
    Ok(path)
}

/// Scan, compile and write both outputs.
pub fn run(config: &CodegenConfig) -> CodegenResult<CodegenReport> {
    let scanned = scan(config)?;
    let contracts = compile_all(&scanned.services);

    let out_dir = Path::new(&config.out_dir);
    std::fs::create_dir_all(out_dir).map_err(|source| CodegenError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let json = serde_json::to_string_pretty(&contracts)?;
    let stubs = render_module(&scanned.services, &config.runtime_path)?;

    let outputs = vec![
        write_file(out_dir.join(&config.contracts_file), &json)?,
        write_file(out_dir.join(&config.stubs_file), &stubs)?,
    ];

    let report = CodegenReport {
        files_scanned: scanned.files.len(),
        services: scanned.services.len(),
        contracts: contracts.len(),
        skipped: scanned.skipped,
        outputs,
    };

    tracing::info!(
        files = report.files_scanned,
        services = report.services,
        contracts = report.contracts,
        skipped = report.skipped.len(),
        "Code generation complete"
    );
    Ok(report)
}
