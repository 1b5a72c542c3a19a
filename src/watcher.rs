//! Filesystem change watcher with a per-root debounce.
//!
//! A `notify` watcher subscribes to each kind directory (non-recursively)
//! and forwards [`FsChange`]s over a channel to a background thread. That
//! thread owns a [`RefreshScheduler`], which keeps one [`Debouncer`] per
//! watched root:
//!
//! ```text
//!            accepted change                 deadline passes
//!   Idle ─────────────────────▶ Debouncing ─────────────────▶ Idle + rebuild
//!                                  │   ▲
//!                                  └───┘ accepted change: deadline = now + delay
//! ```
//!
//! A burst of changes therefore produces one rebuild, which runs once the
//! root has been quiet for the full delay. Rebuilds are global: when any
//! root fires, every debouncer returns to `Idle` and the trigger callback
//! runs once.
//!
//! A change is accepted when its parent is a watched root, its name is not
//! hidden, and it classifies as that root's kind. Folder events and access
//! events are dropped before they reach the scheduler.

use crate::media::{Classifier, MediaKind};
use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("filesystem events unavailable: {0}")]
    Notify(#[from] notify::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// One file-level change under a watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl FsChange {
    /// File-level changes carried by a `notify` event.
    pub fn from_event(event: &Event) -> Vec<FsChange> {
        let kind = match event.kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
                return Vec::new();
            }
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };
        event
            .paths
            .iter()
            .map(|path| FsChange {
                kind,
                path: path.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Debouncing { deadline: Instant },
}

/// Trailing-edge debounce for one root.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DebounceState::Idle,
        }
    }

    /// Record an accepted change, starting or extending the quiet window.
    pub fn observe(&mut self, now: Instant) {
        self.state = DebounceState::Debouncing {
            deadline: now + self.delay,
        };
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Debouncing { deadline } => Some(deadline),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    pub fn is_idle(&self) -> bool {
        self.state == DebounceState::Idle
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::Idle;
    }
}

#[derive(Debug, Clone)]
struct WatchedRoot {
    dir: PathBuf,
    kind: MediaKind,
    debouncer: Debouncer,
}

/// Decides when watched changes turn into a rebuild.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    roots: Vec<WatchedRoot>,
    classifier: Classifier,
}

impl RefreshScheduler {
    pub fn new(roots: Vec<(PathBuf, MediaKind)>, classifier: Classifier, delay: Duration) -> Self {
        Self {
            roots: roots
                .into_iter()
                .map(|(dir, kind)| WatchedRoot {
                    dir,
                    kind,
                    debouncer: Debouncer::new(delay),
                })
                .collect(),
            classifier,
        }
    }

    fn root_for(&self, path: &Path) -> Option<usize> {
        let parent = path.parent()?;
        let kind = self.classifier.classify(path)?;
        self.roots
            .iter()
            .position(|root| root.dir == parent && root.kind == kind)
    }

    /// Feed one change. Returns whether it was accepted.
    pub fn observe(&mut self, change: &FsChange, now: Instant) -> bool {
        match self.root_for(&change.path) {
            Some(index) => {
                self.roots[index].debouncer.observe(now);
                true
            }
            None => false,
        }
    }

    /// Earliest pending deadline across all roots.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.roots
            .iter()
            .filter_map(|root| root.debouncer.deadline())
            .min()
    }

    /// `true` when a rebuild should run now. All roots go back to idle.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.roots.iter().any(|root| root.debouncer.is_due(now)) {
            return false;
        }
        for root in &mut self.roots {
            root.debouncer.reset();
        }
        true
    }
}

enum Message {
    Change(FsChange),
    Stop,
}

/// Running watcher. Dropping it stops the background thread.
pub struct ChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    control: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Watch each `(dir, kind)` root and call `on_trigger` once per
    /// debounced burst of accepted changes.
    ///
    /// Missing directories are created first. Fails when the platform
    /// cannot deliver filesystem events.
    pub fn start<F>(
        roots: &[(PathBuf, MediaKind)],
        classifier: Classifier,
        delay: Duration,
        on_trigger: F,
    ) -> Result<Self, WatchError>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let events = tx.clone();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for change in FsChange::from_event(&event) {
                        let _ = events.send(Message::Change(change));
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watch error"),
            }
        })?;

        let mut watched = Vec::with_capacity(roots.len());
        for (dir, kind) in roots {
            std::fs::create_dir_all(dir)?;
            // Events carry canonical paths
            let dir = dir.canonicalize()?;
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            info!(%kind, dir = %dir.display(), "watching");
            watched.push((dir, *kind));
        }

        let scheduler = RefreshScheduler::new(watched, classifier, delay);
        let handle = spawn_loop(rx, scheduler, on_trigger)?;

        Ok(Self {
            watcher: Some(watcher),
            control: tx,
            handle: Some(handle),
        })
    }

    /// Stop watching and wait for the loop thread to exit.
    ///
    /// Pending debounced changes are dropped. Dropping the watcher does the
    /// same.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.watcher.take());
        let _ = self.control.send(Message::Stop);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("change watcher thread panicked");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_loop<F>(
    rx: Receiver<Message>,
    scheduler: RefreshScheduler,
    on_trigger: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    std::thread::Builder::new()
        .name("change-watcher".into())
        .spawn(move || run_loop(rx, scheduler, on_trigger))
}

fn run_loop(rx: Receiver<Message>, mut scheduler: RefreshScheduler, mut on_trigger: impl FnMut()) {
    loop {
        let message = match scheduler.next_deadline() {
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => return,
            },
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        };

        match message {
            Some(Message::Stop) => return,
            Some(Message::Change(change)) => {
                let accepted = scheduler.observe(&change, Instant::now());
                debug!(path = %change.path.display(), kind = ?change.kind, accepted, "change");
            }
            None => {}
        }

        if scheduler.poll(Instant::now()) {
            info!("changes settled, rebuilding collections");
            if panic::catch_unwind(AssertUnwindSafe(&mut on_trigger)).is_err() {
                error!("collection rebuild panicked, still watching");
            }
        }
    }
}
