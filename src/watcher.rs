//! File watcher for reload-on-save
//!
//! Watches the project's `lib/` directory for Dart file changes and sends
//! a raw save notification per batch of filesystem events. Coalescing into
//! a single reload directive is the supervisor's job: it owns the 250 ms
//! debounce window, reset on every new save.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Paths to watch, relative to the project root
pub const WATCH_PATHS: &[&str] = &["lib"];

/// File extensions that count as a save
pub const DART_EXTENSIONS: &[&str] = &["dart"];

/// A file-save notification; carries no payload, the supervisor only
/// debounces and reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveEvent;

/// Watches a project tree and reports Dart file saves
pub struct SaveWatcher {
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl SaveWatcher {
    /// Start watching; save events are sent to `saves_tx`
    pub fn start(project_root: PathBuf, saves_tx: mpsc::Sender<SaveEvent>) -> Self {
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();

        tokio::task::spawn_blocking(move || {
            Self::run_watcher(project_root, saves_tx, stop_rx);
        });

        Self {
            stop_tx: Some(stop_tx),
        }
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Internal: run the blocking watcher until the stop signal
    fn run_watcher(
        project_root: PathBuf,
        saves_tx: mpsc::Sender<SaveEvent>,
        mut stop_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let tx = saves_tx.clone();
        let watcher_result = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let relevant = event.paths.iter().any(|path| {
                        path.extension()
                            .and_then(|ext| ext.to_str())
                            .map(|ext| DART_EXTENSIONS.contains(&ext))
                            .unwrap_or(false)
                    });
                    if relevant {
                        debug!("File save detected: {:?}", event.paths);
                        let _ = tx.blocking_send(SaveEvent);
                    }
                }
                Err(err) => {
                    warn!("File watcher error: {:?}", err);
                }
            }
        });

        let mut watcher = match watcher_result {
            Ok(w) => w,
            Err(e) => {
                error!("Failed to create file watcher: {}", e);
                return;
            }
        };

        for relative_path in WATCH_PATHS {
            let full_path = project_root.join(relative_path);
            if full_path.exists() {
                if let Err(e) = watcher.watch(&full_path, RecursiveMode::Recursive) {
                    warn!("Failed to watch {}: {}", full_path.display(), e);
                } else {
                    info!("Watching: {}", full_path.display());
                }
            } else {
                warn!("Watch path does not exist: {}", full_path.display());
            }
        }

        // Keep running until stop signal
        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(tokio::sync::oneshot::error::TryRecvError::Closed) => {
                    info!("File watcher stopping");
                    break;
                }
                Err(tokio::sync::oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
}

impl Drop for SaveWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
