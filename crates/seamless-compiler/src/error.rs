//! Error types for the compiler pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from scanning, generating, writing or watching.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan failed with {} error(s): {}", errors.len(), errors.join("; "))]
    Scan { errors: Vec<String> },

    #[error("Invalid schema: {0}")]
    Schema(String),

    #[error("Failed to render manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl CompilerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompilerError>;
