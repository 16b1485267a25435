//! Writing generated artifacts.
//!
//! Each file goes to a temp file with a PID suffix, is synced, then renamed
//! over the target. Files whose contents are already current are left alone so
//! downstream builds do not see a spurious modification.

use crate::error::{CompilerError, Result};
use crate::generator::GeneratedBindings;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use tracing::debug;

/// Which files were rewritten and which were already up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Write all four artifacts into `out_dir`, creating it when missing.
pub fn write_artifacts(out_dir: &Path, bindings: &GeneratedBindings) -> Result<WriteReport> {
    fs::create_dir_all(out_dir).map_err(|e| CompilerError::io(out_dir, e))?;

    let mut report = WriteReport::default();
    for (name, contents) in bindings.files() {
        let path = out_dir.join(name);
        if write_if_changed(&path, contents)? {
            report.written.push(name.to_string());
        } else {
            report.unchanged.push(name.to_string());
        }
    }
    Ok(report)
}

/// Atomically replace `path` with `contents` unless it already holds them.
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == contents {
            debug!("Unchanged: {}", path.display());
            return Ok(false);
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, process::id()));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| CompilerError::io(&temp_path, e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| CompilerError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| CompilerError::io(&temp_path, e))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(CompilerError::io(path, e));
    }

    debug!("Wrote {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, GeneratorOptions};
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directory_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("gen").join("rpc");
        let bindings = generate(&[], &GeneratorOptions::new()).unwrap();

        let report = write_artifacts(&out, &bindings).unwrap();
        assert_eq!(report.written.len(), 4);
        assert!(report.unchanged.is_empty());
        for (name, contents) in bindings.files() {
            assert_eq!(fs::read_to_string(out.join(name)).unwrap(), contents);
        }
    }

    #[test]
    fn test_rewrite_skips_identical_files() {
        let temp_dir = TempDir::new().unwrap();
        let bindings = generate(&[], &GeneratorOptions::new()).unwrap();
        write_artifacts(temp_dir.path(), &bindings).unwrap();

        let report = write_artifacts(temp_dir.path(), &bindings).unwrap();
        assert!(report.written.is_empty());
        assert_eq!(report.unchanged.len(), 4);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client_stubs.rs");
        assert!(write_if_changed(&path, "a").unwrap());
        assert!(write_if_changed(&path, "b").unwrap());

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b");
    }
}
