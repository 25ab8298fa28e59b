//! File system watcher for the open Markdown file
//!
//! Watches the file's parent directory (editors often save by writing a
//! temp file and renaming it over the original) and reports changes to the
//! one file we care about, debounced so a burst of writes is one event.

use crate::error::WatcherError;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::Instant;

/// Change to the watched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Contents were written or the file was replaced
    Modified(PathBuf),
    /// The file is gone
    Removed(PathBuf),
}

/// Map a raw notify event onto the watched file
fn classify(event: &Event, target: &Path) -> Option<WatchEvent> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Modified(target.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Removed(target.to_path_buf())),
        _ => None,
    }
}

/// Trailing debounce over classified events
///
/// The event being held back lives here rather than in the `next` future,
/// so dropping that future inside `select!` loses nothing.
struct ChangeQueue {
    event_rx: UnboundedReceiver<WatchEvent>,
    pending: Option<(WatchEvent, Instant)>,
    debounce: Duration,
}

impl ChangeQueue {
    fn new(event_rx: UnboundedReceiver<WatchEvent>, debounce: Duration) -> Self {
        Self {
            event_rx,
            pending: None,
            debounce,
        }
    }

    fn hold(&mut self, event: WatchEvent) {
        self.pending = Some((event, Instant::now() + self.debounce));
    }

    fn release(&mut self) -> Option<WatchEvent> {
        self.pending.take().map(|(event, _)| event)
    }

    async fn next(&mut self) -> Option<WatchEvent> {
        loop {
            let Some(due) = self.pending.as_ref().map(|(_, due)| *due) else {
                let event = self.event_rx.recv().await?;
                self.hold(event);
                continue;
            };

            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.hold(event),
                    None => return self.release(),
                },
                _ = tokio::time::sleep_until(due) => return self.release(),
            }
        }
    }
}

/// Watches a single file for external changes
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    target: PathBuf,
    changes: ChangeQueue,
}

impl FileWatcher {
    /// Start watching `path`
    pub fn new(path: impl AsRef<Path>, debounce_ms: u64) -> Result<Self, WatcherError> {
        let path = path.as_ref();
        let target = path.canonicalize().map_err(|e| WatcherError::InitError(format!(
            "{}: {}",
            path.display(),
            e
        )))?;
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatcherError::InitError(format!("{} has no parent", target.display())))?;

        let (tx, rx) = unbounded_channel();
        let filter_target = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(change) = classify(&event, &filter_target) {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => log::warn!("File watcher error: {}", e),
            },
            Config::default(),
        )
        .map_err(|e| WatcherError::InitError(e.to_string()))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchError {
                path: parent.clone(),
                source: e,
            })?;
        log::debug!("Watching {} for external changes", target.display());

        Ok(Self {
            _watcher: watcher,
            target,
            changes: ChangeQueue::new(rx, Duration::from_millis(debounce_ms)),
        })
    }

    /// Canonical path of the watched file
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Wait for the next change, coalescing bursts into the latest event
    ///
    /// Returns `None` once the watcher has shut down. Cancel-safe.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.changes.next().await
    }
}
