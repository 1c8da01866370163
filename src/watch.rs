//! Watch mode.
//!
//! Keeps `dist/` in step with the templates while authoring. A filesystem
//! watcher feeds change notifications into a [`RebuildCoordinator`], which
//! allows at most one build at a time:
//!
//! ```text
//!            ┌────────── change (add/modify) ──────────┐
//!            │                                          ▼
//!         IDLE ◄──── build done / failed / panicked ── BUILDING
//!                                                       │
//!                           change while building ──────┘ dropped
//! ```
//!
//! - Changes that arrive while a build is running are dropped, not queued.
//!   The next save after the build finishes picks up everything.
//! - Deletions are reported and never trigger a build. Outputs of deleted
//!   templates stay in `dist/`.
//! - The guard is an atomic compare-exchange, and the state returns to IDLE
//!   through a drop guard, so even a panicking build releases it.
//!
//! Builds run on a worker thread, so the event loop keeps draining (and
//! dropping) notifications while one is in flight. Results are sent as
//! [`WatchEvent`]s over a channel; the CLI prints them from its own thread.

use crate::compile::{self, BuildError, BuildRun, MarkupCompiler};
use crate::config::ProjectConfig;
use crate::naming::Layout;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use thiserror::Error;

/// File extensions whose changes can affect compiled output.
const WATCHED_EXTENSIONS: &[&str] = &["mjml"];

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// What [`RebuildCoordinator::on_change`] did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A rebuild started.
    Started,
    /// A rebuild was already running; the notification was dropped.
    Ignored,
    /// Reported only (deletions).
    Reported,
}

/// Progress reports from watch mode.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// `trigger` is `None` for the initial build.
    BuildStarted { trigger: Option<PathBuf> },
    BuildFinished(BuildRun),
    BuildFailed(String),
    Dropped { path: PathBuf },
    Removed { path: PathBuf },
    WatcherError(String),
}

/// Resets the building flag when dropped, including during unwinding.
struct IdleGuard(Arc<AtomicBool>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// IDLE/BUILDING state machine around [`compile::build`].
pub struct RebuildCoordinator<C> {
    root: PathBuf,
    config: Arc<ProjectConfig>,
    compiler: Arc<C>,
    building: Arc<AtomicBool>,
    events: Sender<WatchEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<C: MarkupCompiler + Send + 'static> RebuildCoordinator<C> {
    pub fn new(root: &Path, config: ProjectConfig, compiler: C, events: Sender<WatchEvent>) -> Self {
        Self {
            root: root.to_path_buf(),
            config: Arc::new(config),
            compiler: Arc::new(compiler),
            building: Arc::new(AtomicBool::new(false)),
            events,
            worker: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::SeqCst)
    }

    fn emit(&self, event: WatchEvent) {
        // The receiver only goes away during shutdown.
        let _ = self.events.send(event);
    }

    fn try_acquire(&self) -> Option<IdleGuard> {
        self.building
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| IdleGuard(Arc::clone(&self.building)))
    }

    /// Build once, synchronously, before watching starts.
    pub fn initial_build(&self) -> Result<BuildRun, BuildError> {
        self.wait_idle();
        let guard = self.try_acquire();
        self.emit(WatchEvent::BuildStarted { trigger: None });
        let result = compile::build(&self.root, &self.config, self.compiler.as_ref());
        drop(guard);
        match &result {
            Ok(run) => self.emit(WatchEvent::BuildFinished(run.clone())),
            Err(e) => self.emit(WatchEvent::BuildFailed(e.to_string())),
        }
        result
    }

    /// Handle one filesystem notification.
    pub fn on_change(&self, path: &Path, kind: ChangeKind) -> Dispatch {
        if kind == ChangeKind::Removed {
            self.emit(WatchEvent::Removed {
                path: path.to_path_buf(),
            });
            return Dispatch::Reported;
        }

        let Some(guard) = self.try_acquire() else {
            log::debug!("Build in progress, dropping change to {}", path.display());
            self.emit(WatchEvent::Dropped {
                path: path.to_path_buf(),
            });
            return Dispatch::Ignored;
        };

        self.emit(WatchEvent::BuildStarted {
            trigger: Some(path.to_path_buf()),
        });

        let root = self.root.clone();
        let config = Arc::clone(&self.config);
        let compiler = Arc::clone(&self.compiler);
        let events = self.events.clone();
        let handle = std::thread::spawn(move || {
            let result = compile::build(&root, &config, compiler.as_ref());
            // Back to IDLE before reporting, so a reader reacting to the
            // report can trigger the next build.
            drop(guard);
            let event = match result {
                Ok(run) => WatchEvent::BuildFinished(run),
                Err(e) => WatchEvent::BuildFailed(e.to_string()),
            };
            let _ = events.send(event);
        });

        let previous = self
            .worker
            .lock()
            .ok()
            .and_then(|mut worker| worker.replace(handle));
        // A previous worker has already released the guard; reap it.
        if let Some(previous) = previous {
            let _ = previous.join();
        }
        Dispatch::Started
    }

    /// Block until the in-flight build (if any) has finished.
    pub fn wait_idle(&self) {
        let handle = self.worker.lock().ok().and_then(|mut worker| worker.take());
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            log::error!("Rebuild worker panicked");
        }
    }
}

/// Which paths are worth rebuilding for.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    root: PathBuf,
    pruned: Vec<PathBuf>,
    ignored_dirs: Vec<String>,
}

impl ChangeFilter {
    pub fn new(root: &Path, config: &ProjectConfig) -> Self {
        let layout = Layout::new(Path::new(""), config);
        Self {
            root: root.to_path_buf(),
            pruned: vec![layout.output, layout.exports],
            ignored_dirs: config.paths.ignored_dirs.clone(),
        }
    }

    /// Templates (including shared components) outside generated and
    /// ignored directories.
    pub fn relevant(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let watched_ext = rel
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| WATCHED_EXTENSIONS.contains(&e));
        if !watched_ext || self.pruned.iter().any(|p| rel.starts_with(p)) {
            return false;
        }
        let dirs: Vec<Component> = rel.parent().map(|p| p.components().collect()).unwrap_or_default();
        !dirs.iter().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            let hidden = name.starts_with('.') && name != "." && name != "..";
            hidden || self.ignored_dirs.iter().any(|d| *d == name)
        })
    }
}

/// Map a notify event kind onto the coordinator's vocabulary.
///
/// Two-path renames have no single kind; [`changes`] splits them.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Per-path changes carried by one notify event.
///
/// A rename reported with both paths removes the first and adds the second.
pub fn changes(event: &Event) -> Vec<(&Path, ChangeKind)> {
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        return event
            .paths
            .iter()
            .map(PathBuf::as_path)
            .zip([ChangeKind::Removed, ChangeKind::Added])
            .collect();
    }
    match classify(&event.kind) {
        Some(kind) => event.paths.iter().map(|p| (p.as_path(), kind)).collect(),
        None => Vec::new(),
    }
}

enum Message {
    Fs(notify::Result<Event>),
    Shutdown,
}

/// Stops a running [`WatchSession`]. Cheap to clone and send across threads.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<Message>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// A filesystem watcher driving a coordinator until shut down.
pub struct WatchSession<C> {
    coordinator: RebuildCoordinator<C>,
    filter: ChangeFilter,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}

impl<C: MarkupCompiler + Send + 'static> WatchSession<C> {
    pub fn new(coordinator: RebuildCoordinator<C>) -> Self {
        let filter = ChangeFilter::new(coordinator.root(), coordinator.config());
        let (tx, rx) = mpsc::channel();
        Self {
            coordinator,
            filter,
            tx,
            rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.tx.clone(),
        }
    }

    /// Watch the project root until the shutdown handle fires.
    ///
    /// The watcher is closed before this returns, then any in-flight build
    /// is allowed to finish.
    pub fn run(self) -> Result<(), WatchError> {
        let fs_tx = self.tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = fs_tx.send(Message::Fs(res));
        })?;
        watcher.watch(self.coordinator.root(), RecursiveMode::Recursive)?;
        log::info!("Watching {} for template changes", self.coordinator.root().display());

        while let Ok(message) = self.rx.recv() {
            match message {
                Message::Fs(Ok(event)) => {
                    for (path, kind) in changes(&event) {
                        if self.filter.relevant(path) {
                            log::trace!("{:?} {}", kind, path.display());
                            self.coordinator.on_change(path, kind);
                        }
                    }
                }
                Message::Fs(Err(e)) => {
                    log::warn!("Watcher error: {e}");
                    self.coordinator.emit(WatchEvent::WatcherError(e.to_string()));
                }
                Message::Shutdown => break,
            }
        }

        drop(watcher);
        log::info!("Watcher closed");
        self.coordinator.wait_idle();
        Ok(())
    }
}
