//! File-system watching for watch mode.
//!
//! Wraps the `notify` crate's recommended OS watcher and forwards
//! create/modify/remove events for files with watched extensions into a
//! tokio channel. The OS watcher handle is kept alive for the lifetime of
//! the session; dropping it silently stops event delivery.

use std::path::{Path, PathBuf};

use notify::{recommended_watcher, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::errors::Result;

/// Watches a bundle's source roots and yields changed file paths.
pub struct BundleWatcher {
    /// The underlying OS watcher (kept alive to receive events).
    _watcher: notify::RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<PathBuf>,
}

impl BundleWatcher {
    /// Watch `roots` recursively, reporting only files whose extension is in
    /// `extensions`.
    pub fn watch(roots: &[PathBuf], extensions: &[String]) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watched_extensions = extensions.to_vec();

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if !is_change(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if has_watched_extension(&path, &watched_extensions) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => warn!("Watcher error: {e}"),
            }
        })?;

        for root in roots {
            debug!("Watching {} recursively", root.display());
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next changed file. Returns `None` when the watcher has
    /// shut down.
    pub async fn next_changed(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }

    /// Drain an already-queued change without waiting, for coalescing events
    /// that arrived while a rebuild was in flight.
    pub fn try_next_changed(&mut self) -> Option<PathBuf> {
        self.rx.try_recv().ok()
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn has_watched_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|watched| watched == ext))
}
