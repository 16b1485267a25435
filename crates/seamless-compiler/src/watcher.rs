//! Source watcher for development mode.
//!
//! Watches the scan root and invokes a callback once per quiet period after any
//! `.rs` file outside the output directory changes.

use crate::error::Result;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the event loop checks for a stop request.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Callback invoked after relevant source changes settle.
pub type ChangeCallback = Box<dyn Fn(Vec<PathBuf>) + Send + 'static>;

/// Watches a source tree until stopped or dropped.
pub struct SourceWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    stopped: Arc<AtomicBool>,
}

impl SourceWatcher {
    /// Start watching `root` recursively. Changes under `ignore` (typically the
    /// output directory) never trigger the callback.
    pub fn new(
        root: impl AsRef<Path>,
        ignore: Option<PathBuf>,
        debounce: Duration,
        on_change: ChangeCallback,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::channel::<DebounceEventResult>();

        let mut debouncer = new_debouncer(debounce, event_tx)?;
        debouncer.watcher().watch(&root, RecursiveMode::Recursive)?;
        info!("Watching {} for changes", root.display());

        let stopped = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stopped);

        std::thread::spawn(move || loop {
            if stop_flag.load(Ordering::SeqCst) {
                debug!("Source watcher stopping");
                break;
            }
            match event_rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(events)) => {
                    let mut changed: Vec<PathBuf> = events
                        .into_iter()
                        .map(|event| event.path)
                        .filter(|path| is_relevant_change(path, ignore.as_deref()))
                        .collect();
                    changed.sort();
                    changed.dedup();
                    if !changed.is_empty() {
                        debug!("{} source file(s) changed", changed.len());
                        on_change(changed);
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Source watcher channel disconnected");
                    break;
                }
            }
        });

        Ok(Self {
            _debouncer: debouncer,
            stopped,
        })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A Rust source file outside the ignored directory.
fn is_relevant_change(path: &Path, ignore: Option<&Path>) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("rs") {
        return false;
    }
    match ignore {
        Some(dir) => !path.starts_with(dir),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_relevant_change() {
        let out = Path::new("/app/src/generated");
        assert!(is_relevant_change(Path::new("/app/src/api/users.rs"), Some(out)));
        assert!(!is_relevant_change(Path::new("/app/src/generated/client_stubs.rs"), Some(out)));
        assert!(!is_relevant_change(Path::new("/app/src/api/README.md"), Some(out)));
        assert!(!is_relevant_change(Path::new("/app/src/api/users.rs.1234.tmp"), None));
        assert!(is_relevant_change(Path::new("/app/src/lib.rs"), None));
    }
}
