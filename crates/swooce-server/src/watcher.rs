//! Source file watching.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// A change to a watched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Modified(path) | Self::Deleted(path) => path,
        }
    }
}

/// Watches source directories and forwards changes to an async channel.
///
/// Events stop when the watcher is dropped.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    /// Watch `paths` recursively. Paths that do not exist are skipped.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
                tracing::debug!("Watching {}", path.display());
            }
        }

        std::thread::spawn(move || debounce(sync_rx, async_tx));

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Forward changes once no event has arrived for [`DEBOUNCE`].
///
/// Pending changes are keyed by path and keep their latest kind. They are
/// flushed when the quiet period ends or the watcher goes away.
fn debounce(events: mpsc::Receiver<notify::Event>, changes: async_mpsc::Sender<WatchEvent>) {
    let mut pending: Vec<WatchEvent> = Vec::new();

    loop {
        let next = if pending.is_empty() {
            events.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            events.recv_timeout(DEBOUNCE)
        };

        match next {
            Ok(event) => {
                for path in &event.paths {
                    if let Some(change) = classify_event(path, &event.kind) {
                        pending.retain(|seen| seen.path() != change.path());
                        pending.push(change);
                    }
                }
            }
            Err(timeout) => {
                for change in pending.drain(..) {
                    if changes.blocking_send(change).is_err() {
                        return;
                    }
                }
                if timeout == RecvTimeoutError::Disconnected {
                    return;
                }
            }
        }
    }
}

fn classify_event(path: &Path, kind: &EventKind) -> Option<WatchEvent> {
    let path = path.to_path_buf();

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path)),
        EventKind::Modify(_) => Some(WatchEvent::Modified(path)),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path)),
        _ => None,
    }
}
