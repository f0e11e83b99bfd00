use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{ShaderError, ShaderResult};

fn watch_error(path: &Path, error: impl std::fmt::Display) -> ShaderError {
    ShaderError::WatchError {
        path: path.display().to_string(),
        error: error.to_string(),
    }
}

/// Drops repeat events for a path inside the debounce window
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Whether an event for `path` at `now` should be let through
    pub fn accept(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_seen.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }
}

/// Recursive file watcher over shader source directories.
///
/// `notify` delivers events on its own thread; they cross over a channel and
/// are debounced when polled, so everything the caller sees happens on the
/// polling thread.
pub struct ShaderWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<(PathBuf, Instant)>,
    debouncer: Debouncer,
    watched_paths: Vec<PathBuf>,
}

impl ShaderWatcher {
    pub fn new(debounce_ms: u64) -> ShaderResult<Self> {
        let (tx, rx): (Sender<(PathBuf, Instant)>, _) = crossbeam_channel::unbounded();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            let now = Instant::now();
            for path in event.paths {
                // Receiver gone means the watcher is being dropped
                let _ = tx.send((path, now));
            }
        })
        .map_err(|e| watch_error(Path::new("<watcher>"), e))?;

        Ok(Self {
            watcher,
            rx,
            debouncer: Debouncer::new(Duration::from_millis(debounce_ms)),
            watched_paths: Vec::new(),
        })
    }

    /// Watch a directory recursively
    pub fn watch_dir(&mut self, path: impl AsRef<Path>) -> ShaderResult<()> {
        let path = path.as_ref();
        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| watch_error(path, e))?;
        self.watched_paths.push(path.to_path_buf());
        log::info!("[hot_reload] watching {}", path.display());
        Ok(())
    }

    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> ShaderResult<()> {
        let path = path.as_ref();
        self.watcher.unwatch(path).map_err(|e| watch_error(path, e))?;
        self.watched_paths.retain(|p| p != path);
        Ok(())
    }

    /// Paths changed since the last poll, debounced and without duplicates.
    /// Never blocks.
    pub fn poll_changed(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        while let Ok((path, at)) = self.rx.try_recv() {
            if self.debouncer.accept(&path, at) && !changed.contains(&path) {
                changed.push(path);
            }
        }
        if !changed.is_empty() {
            log::debug!("[hot_reload] {} path(s) changed", changed.len());
        }
        changed
    }

    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }

    pub fn clear_debounce(&mut self) {
        self.debouncer.clear();
    }
}
