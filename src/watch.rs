use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Reports a change once events for a path have been quiet for `settle`.
/// Editors often save through several writes or a rename.
#[derive(Debug)]
pub struct Debouncer {
    settle: Duration,
    pending_since: Option<Instant>,
}

impl Debouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending_since: None,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// True once per burst of events, after the burst has settled.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(last) if now.duration_since(last) >= self.settle => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches a single shader file. Polled once per frame; never blocks.
pub struct ShaderWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
    debouncer: Debouncer,
}

impl ShaderWatcher {
    pub fn new(path: &Path, settle: Duration) -> Result<Self> {
        let target = canonical_path(path);
        let (tx, rx) = mpsc::channel::<()>();
        let watched = target.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if is_content_change(&event.kind) && event_targets(&event, &watched) {
                        let _ = tx.send(());
                    }
                }
                Err(error) => {
                    log::warn!("File watcher error: {}", error);
                }
            })
            .context("Failed to create file watcher")?;

        // Watch the directory so editors that replace the file are still seen.
        let watch_root = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        watcher
            .watch(&watch_root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", watch_root.display()))?;
        log::info!("Watching {}", target.display());

        Ok(Self {
            _watcher: watcher,
            rx,
            debouncer: Debouncer::new(settle),
        })
    }

    /// Drains pending notifications; true when the file should be reloaded.
    pub fn poll_changed(&mut self) -> bool {
        let now = Instant::now();
        while self.rx.try_recv().is_ok() {
            self.debouncer.record(now);
        }
        self.debouncer.ready(now)
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
    )
}

fn event_targets(event: &Event, target: &Path) -> bool {
    if event.paths.is_empty() {
        return true;
    }

    event.paths.iter().any(|path| {
        path == target
            || std::fs::canonicalize(path)
                .map(|resolved| resolved == target)
                .unwrap_or(false)
    })
}

fn canonical_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
