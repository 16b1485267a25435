//! Discovery and code generation for seamless RPC.
//!
//! The pipeline has three stages, each usable on its own:
//!
//! 1. [`analyze`] scans a source root for `pub async fn` items carrying an
//!    `@rpc` schema annotation and returns [`MethodDescriptor`]s.
//! 2. [`generate`] turns descriptors into four text artifacts.
//! 3. [`write_artifacts`] puts them on disk, leaving unchanged files alone.
//!
//! [`compile`] runs all three; [`watch`] re-runs them whenever sources change.
//!
//! ```rust,ignore
//! use seamless_compiler::{compile, GeneratorOptions, ScanOptions};
//!
//! let report = compile(
//!     Path::new("src/server"),
//!     Path::new("src/generated"),
//!     &ScanOptions::new().with_include("api"),
//!     &GeneratorOptions::new().with_server_module_root("crate::server"),
//! )?;
//! println!("{} functions, {} files written", report.functions.len(), report.written.len());
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod generator;
pub mod output;
pub mod watcher;

pub use analyzer::schema::{FieldTag, Schema, TypeTag};
pub use analyzer::{analyze, AnalysisResult, MethodDescriptor, ParameterDescriptor, ScanOptions};
pub use config::CompilerConfig;
pub use error::{CompilerError, Result};
pub use generator::{generate, GeneratedBindings, GeneratorOptions};
pub use output::{write_artifacts, WriteReport};
pub use watcher::{ChangeCallback, SourceWatcher};

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Outcome of one scan/generate/write pass.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    pub functions: Vec<MethodDescriptor>,
    /// Non-fatal scan errors.
    pub errors: Vec<String>,
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Scan `root`, generate bindings and write them into `out_dir`.
pub fn compile(
    root: &Path,
    out_dir: &Path,
    scan: &ScanOptions,
    options: &GeneratorOptions,
) -> Result<CompileReport> {
    let analysis = analyze(root, scan)?;
    let bindings = generate(&analysis.functions, options)?;
    let written = write_artifacts(out_dir, &bindings)?;

    info!(
        "Generated bindings for {} function(s) into {} ({} written, {} unchanged)",
        analysis.functions.len(),
        out_dir.display(),
        written.written.len(),
        written.unchanged.len()
    );

    Ok(CompileReport {
        functions: analysis.functions,
        errors: analysis.errors,
        written: written.written,
        unchanged: written.unchanged,
    })
}

/// Compile once, then again after every settled batch of source changes.
///
/// Failures during a rebuild are logged and the watcher keeps running. The
/// returned watcher stops when dropped.
pub fn watch(
    root: &Path,
    out_dir: &Path,
    scan: ScanOptions,
    options: GeneratorOptions,
    debounce: Duration,
) -> Result<(CompileReport, SourceWatcher)> {
    let initial = compile(root, out_dir, &scan, &options)?;

    let source_root = root.to_path_buf();
    let target: PathBuf = out_dir.to_path_buf();
    let ignore = absolute(out_dir);
    let watcher = SourceWatcher::new(
        root,
        Some(ignore),
        debounce,
        Box::new(move |changed| {
            info!("Regenerating after {} change(s)", changed.len());
            if let Err(e) = compile(&source_root, &target, &scan, &options) {
                error!("Regeneration failed: {}", e);
            }
        }),
    )?;
    Ok((initial, watcher))
}

/// Event paths are absolute, so the ignored directory must be too.
fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
