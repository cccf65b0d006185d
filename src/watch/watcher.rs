// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::engine::WatchEvent;

/// Handle for the filesystem watcher.
///
/// Keeps the debouncer (and its notify watcher) alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: Debouncer<RecommendedWatcher>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `dirs` recursively and forward every debounced batch of changed
/// paths as one [`WatchEvent::Changed`].
///
/// If any of `dirs` does not exist yet, `root` itself is watched instead so
/// the directory is still seen once it is created.
pub fn spawn_watcher(
    root: &Path,
    dirs: Vec<PathBuf>,
    debounce: Duration,
    tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<WatcherHandle> {
    // Closure called synchronously by the debouncer thread.
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
            if let Err(err) = tx.send(WatchEvent::Changed(paths)) {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("builddag: failed to forward file change: {err}");
            }
        }
        Err(err) => {
            eprintln!("builddag: file watch error: {err}");
        }
    })?;

    for dir in watch_targets(root, dirs) {
        debouncer.watcher().watch(&dir, RecursiveMode::Recursive)?;
        debug!(dir = ?dir, "watching directory");
    }

    info!(debounce_ms = debounce.as_millis() as u64, "file watcher started on {:?}", root);

    Ok(WatcherHandle { _inner: debouncer })
}

/// Directories to register with the watcher.
fn watch_targets(root: &Path, dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let missing: Vec<&PathBuf> = dirs.iter().filter(|d| !d.is_dir()).collect();
    if dirs.is_empty() || !missing.is_empty() {
        if !missing.is_empty() {
            warn!(missing = ?missing, "source directory missing; watching {:?} instead", root);
        }
        return vec![root.to_path_buf()];
    }
    dirs
}
