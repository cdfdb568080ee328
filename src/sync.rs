//! Background synchronization between the document source and the repository.
//!
//! The engine polls the source, diffs the new listing against the one it
//! retained from the last successful reload (keyed by relative path, compared
//! by modification time), and on any difference reloads everything: read all
//! documents, rebuild the graph, resolve every model, publish a new snapshot.
//! There is no incremental patching.
//!
//! A failed cycle leaves both the published snapshot and the retained listing
//! untouched, so the next tick sees the same difference and tries again.
//!
//! `RepositorySync::tick` runs one cycle synchronously. `RepositorySync::spawn`
//! moves the engine onto a dedicated thread that sleeps between ticks and
//! listens for control messages; the returned `SyncHandle` stops and joins it.

use crate::error::SyncError;
use crate::graph::ModelGraph;
use crate::model::ModelId;
use crate::repository::{ModelRepository, RepositoryHandle};
use crate::resolver;
use crate::source::{self, DocumentSource, SourceEntry};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, info_span, warn};

const THREAD_NAME: &str = "dtdl-repository-sync";

/// Relative path to modification time, as of one listing.
pub type Listing = BTreeMap<PathBuf, SystemTime>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root location of the documents.
    pub root: PathBuf,
    /// Wait after a cycle that found nothing to do (or failed).
    pub poll_interval: Duration,
    /// Wait after a cycle that published a new snapshot.
    pub reload_interval: Duration,
    /// Only files with this extension are tracked; `None` tracks everything.
    pub extension: Option<String>,
}

impl SyncConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: Duration::from_secs(2),
            reload_interval: Duration::from_secs(2),
            extension: Some("json".to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Differences between two listings.
pub struct ListingDiff {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl ListingDiff {
    /// Compare `new` against `old`.
    ///
    /// An entry counts as modified only when its timestamp moved forward; a
    /// timestamp moving backwards is not treated as a change.
    pub fn between(old: &Listing, new: &Listing) -> Self {
        let mut diff = ListingDiff::default();
        for (path, modified) in new {
            match old.get(path) {
                None => diff.added.push(path.clone()),
                Some(previous) if modified > previous => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.removed = old
            .keys()
            .filter(|path| !new.contains_key(*path))
            .cloned()
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
}

/// Loading flag shared between the engine and every `SyncHandle`.
#[derive(Clone, Debug, Default)]
struct StateCell(Arc<AtomicBool>);

impl StateCell {
    fn get(&self) -> SyncState {
        if self.0.load(Ordering::Acquire) {
            SyncState::Loading
        } else {
            SyncState::Idle
        }
    }

    fn set(&self, state: SyncState) {
        self.0.store(state == SyncState::Loading, Ordering::Release);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// What one cycle did.
pub enum TickOutcome {
    /// The listing matched the retained one; nothing was read.
    Unchanged,
    /// Startup found no documents yet; nothing was published.
    AwaitingDocuments,
    /// A new snapshot was published.
    Reloaded { generation: u64, diff: ListingDiff },
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Notification sent to subscribers after every successful reload.
///
/// Hosts use the identifier set to refresh allowed-value constraints they own
/// (for example a model selector attribute).
pub struct RepositoryChanged {
    pub generation: u64,
    pub identifiers: BTreeSet<ModelId>,
}

/// Single-writer engine that keeps a `RepositoryHandle` current.
pub struct RepositorySync {
    source: Arc<dyn DocumentSource>,
    config: SyncConfig,
    repository: RepositoryHandle,
    previous: Option<Listing>,
    force_reload: bool,
    generation: u64,
    state: StateCell,
    subscribers: Vec<Sender<RepositoryChanged>>,
}

impl RepositorySync {
    pub fn new(source: Arc<dyn DocumentSource>, config: SyncConfig) -> Self {
        Self::with_repository(source, config, RepositoryHandle::new())
    }

    /// Drive an existing handle; generations continue from its snapshot.
    pub fn with_repository(
        source: Arc<dyn DocumentSource>,
        config: SyncConfig,
        repository: RepositoryHandle,
    ) -> Self {
        let generation = repository.current().generation();
        Self {
            source,
            config,
            repository,
            previous: None,
            force_reload: false,
            generation,
            state: StateCell::default(),
            subscribers: Vec::new(),
        }
    }

    /// Handle readers use to pin the latest snapshot.
    pub fn repository(&self) -> RepositoryHandle {
        self.repository.clone()
    }

    /// Receive a `RepositoryChanged` after every successful reload.
    pub fn subscribe(&mut self) -> Receiver<RepositoryChanged> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// `Loading` while a reload cycle is reading and resolving documents.
    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Point the engine at a new root; the next cycle reloads unconditionally.
    pub fn retarget(&mut self, root: PathBuf) {
        info!(root = %root.display(), "models root changed");
        self.config.root = root;
        self.previous = None;
        self.force_reload = true;
    }

    /// Make the next cycle reload even if the listing is unchanged.
    pub fn request_reload(&mut self) {
        self.force_reload = true;
    }

    /// Run one synchronous cycle: list, diff, and reload when needed.
    pub fn tick(&mut self) -> Result<TickOutcome, SyncError> {
        let entries = source::list_documents(
            self.source.as_ref(),
            &self.config.root,
            self.config.extension.as_deref(),
        )?;
        let listing: Listing = entries
            .iter()
            .map(|entry| (entry.relative_path.clone(), entry.modified))
            .collect();

        let diff = match &self.previous {
            Some(previous) => ListingDiff::between(previous, &listing),
            None => ListingDiff::between(&Listing::new(), &listing),
        };
        if !self.force_reload {
            if self.previous.is_none() && listing.is_empty() {
                debug!(root = %self.config.root.display(), "no documents yet");
                return Ok(TickOutcome::AwaitingDocuments);
            }
            if self.previous.is_some() && diff.is_empty() {
                return Ok(TickOutcome::Unchanged);
            }
        }

        let generation = self.reload(&entries)?;
        self.previous = Some(listing);
        self.force_reload = false;
        Ok(TickOutcome::Reloaded { generation, diff })
    }

    /// Wait before the next cycle, given how the last one went.
    pub fn next_wait(&self, outcome: &Result<TickOutcome, SyncError>) -> Duration {
        match outcome {
            Ok(TickOutcome::Reloaded { .. }) => self.config.reload_interval,
            _ => self.config.poll_interval,
        }
    }

    /// Move the engine onto its own thread.
    ///
    /// The first cycle starts immediately.
    pub fn spawn(self) -> std::io::Result<SyncHandle> {
        let (control, commands) = mpsc::channel();
        let repository = self.repository.clone();
        let state = self.state.clone();
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run(commands))?;
        Ok(SyncHandle {
            control,
            thread: Some(thread),
            repository,
            state,
        })
    }

    fn reload(&mut self, entries: &[SourceEntry]) -> Result<u64, SyncError> {
        let span = info_span!("reload", root = %self.config.root.display());
        let _entered = span.enter();

        self.state.set(SyncState::Loading);
        let built = self.build_snapshot(entries);
        self.state.set(SyncState::Idle);
        let repository = built?;

        let generation = repository.generation();
        let published = self.repository.publish(repository);
        self.generation = generation;
        info!(
            generation,
            models = published.len(),
            failures = published.failures().len(),
            "published repository snapshot"
        );
        self.notify(&published);
        Ok(generation)
    }

    fn build_snapshot(&self, entries: &[SourceEntry]) -> Result<ModelRepository, SyncError> {
        let documents = source::read_documents(self.source.as_ref(), &self.config.root, entries)?;
        let graph = ModelGraph::build(&documents);
        debug!(
            documents = documents.len(),
            interfaces = graph.len(),
            rejected = graph.rejected().len(),
            "built model graph"
        );
        let resolution = resolver::resolve_all(&graph);
        Ok(ModelRepository::from_resolution(
            self.generation + 1,
            resolution,
        ))
    }

    fn notify(&mut self, repository: &ModelRepository) {
        let event = RepositoryChanged {
            generation: repository.generation(),
            identifiers: repository.identifiers(),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn run(mut self, commands: Receiver<Control>) {
        info!(root = %self.config.root.display(), "repository sync started");
        let mut wait = Duration::ZERO;
        loop {
            let mut pending = match commands.recv_timeout(wait) {
                Ok(command) => vec![command],
                Err(RecvTimeoutError::Timeout) => Vec::new(),
                Err(RecvTimeoutError::Disconnected) => break,
            };
            pending.extend(commands.try_iter());
            if pending.iter().any(|command| matches!(command, Control::Stop)) {
                break;
            }
            for command in pending {
                match command {
                    Control::Reload => self.request_reload(),
                    Control::Retarget(root) => self.retarget(root),
                    Control::Stop => {}
                }
            }

            let outcome = self.tick();
            match &outcome {
                Ok(TickOutcome::Unchanged) => {}
                Ok(TickOutcome::AwaitingDocuments) => {
                    warn!(root = %self.config.root.display(), "no documents found, retrying")
                }
                Ok(TickOutcome::Reloaded { diff, .. }) => debug!(
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    modified = diff.modified.len(),
                    "listing changed"
                ),
                Err(err) => error!(error = %err, "reload cycle failed; keeping previous snapshot"),
            }
            wait = self.next_wait(&outcome);
        }
        info!("repository sync stopped");
    }
}

enum Control {
    Reload,
    Retarget(PathBuf),
    Stop,
}

/// Owner of a running sync thread.
///
/// Dropping the handle stops and joins the thread; at most the cycle already
/// in progress finishes first.
pub struct SyncHandle {
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
    repository: RepositoryHandle,
    state: StateCell,
}

impl SyncHandle {
    pub fn repository(&self) -> &RepositoryHandle {
        &self.repository
    }

    /// Pin the latest published snapshot.
    pub fn current(&self) -> Arc<ModelRepository> {
        self.repository.current()
    }

    /// Whether the engine thread is in the middle of a reload.
    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    /// Reload now, bypassing the poll timer. Returns false once stopped.
    pub fn reload_now(&self) -> bool {
        self.control.send(Control::Reload).is_ok()
    }

    /// Switch to a new models root and reload immediately.
    pub fn retarget(&self, root: impl Into<PathBuf>) -> bool {
        self.control.send(Control::Retarget(root.into())).is_ok()
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn stop(mut self) -> thread::Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> thread::Result<()> {
        let _ = self.control.send(Control::Stop);
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
