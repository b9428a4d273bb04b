//! wirecall-codegen
//!
//! Scans a source tree for decorated controllers and gateways (and TOML
//! endpoint manifests), compiles their endpoint contracts and writes
//! `contracts.json` plus a Rust stub module.
//!
//! ```text
//! wirecall-codegen --config wirecall.toml
//! wirecall-codegen --root ./server/src --out ./client/src/generated
//! wirecall-codegen --check
//! ```

use std::path::PathBuf;

use clap::Parser;

use wirecall::codegen;
use wirecall::config::{load_config, WirecallConfig};
use wirecall::contract::compile_all;
use wirecall::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "wirecall-codegen")]
#[command(about = "Generate endpoint contracts and client stubs", long_about = None)]
struct Cli {
    /// TOML config file; the [codegen] table is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan (overrides codegen.root).
    #[arg(short, long)]
    root: Option<String>,

    /// Output directory (overrides codegen.out_dir).
    #[arg(short, long)]
    out: Option<String>,

    /// Crate path used in the generated `use` line (overrides codegen.runtime_path).
    #[arg(long)]
    runtime_path: Option<String>,

    /// Scan and compile only; write nothing.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WirecallConfig::default(),
    };
    init_logging(&config.observability.log_level);

    tracing::info!("wirecall-codegen v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(root) = cli.root {
        config.codegen.root = root;
    }
    if let Some(out) = cli.out {
        config.codegen.out_dir = out;
    }
    if let Some(runtime_path) = cli.runtime_path {
        config.codegen.runtime_path = runtime_path;
    }

    tracing::info!(
        root = %config.codegen.root,
        out_dir = %config.codegen.out_dir,
        include = ?config.codegen.include,
        "Configuration loaded"
    );

    if cli.check {
        let scanned = codegen::scan(&config.codegen)?;
        let contracts = compile_all(&scanned.services);
        for contract in &contracts {
            println!("{:<8} {:<40} {}", contract.verb.as_str(), contract.path_template, contract.id);
        }
        for skipped in &scanned.skipped {
            eprintln!("skipped: {}: {}", skipped.file.display(), skipped.error);
        }
        println!(
            "{} files, {} services, {} contracts, {} skipped",
            scanned.files.len(),
            scanned.services.len(),
            contracts.len(),
            scanned.skipped.len()
        );
        return Ok(());
    }

    let report = codegen::run(&config.codegen)?;
    for path in &report.outputs {
        println!("wrote {}", path.display());
    }
    if !report.skipped.is_empty() {
        eprintln!("{} members skipped; see log for details", report.skipped.len());
    }

    Ok(())
}
