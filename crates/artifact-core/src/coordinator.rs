//! Editor session coordinator.
//!
//! # Overview
//!
//! [`Coordinator`] owns the artifact list and at most one [`EditorSession`]. Every mutation of the
//! working buffer goes through it, and it arbitrates the three write paths:
//!
//! - **autosave**: each edit re-arms the session's debounce timer; when it elapses while the
//!   session is still dirty, the buffer is validated and written
//! - **manual save**: validates and writes immediately
//! - **restore / remote pull**: load content into the buffer without writing
//!
//! # Concurrency
//!
//! Gateway calls run on the configured [`Spawner`] and report back over a channel. Their results,
//! and the debounce timer, are only applied inside [`Coordinator::poll`], so all state transitions
//! happen on the host's thread. At most one write is in flight per session; further save requests
//! are coalesced and replayed once it resolves, and edits made meanwhile stay in the buffer.
//!
//! Each session carries a generation number. Results that belong to an earlier session update the
//! artifact list but never the current session. A listing only reflects the store as of its
//! dispatch: creates, writes and deletes confirmed later are laid back over it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use artifact_core::{
//!     ArtifactKind, Coordinator, ManualClock, MemoryGateway, QueuedSpawner, Rejection,
//!     SessionState,
//! };
//!
//! let gateway = Arc::new(MemoryGateway::new());
//! gateway.seed_at_version("site/app.js", ArtifactKind::JavaScript, "a=1", 3).unwrap();
//!
//! let clock = Arc::new(ManualClock::new());
//! let spawner = Arc::new(QueuedSpawner::new());
//! let accept_all = |_kind: ArtifactKind, _text: &str| -> Result<(), Rejection> { Ok(()) };
//! let mut coordinator = Coordinator::new(gateway, Arc::new(accept_all))
//!     .with_clock(clock.clone())
//!     .with_spawner(spawner.clone());
//!
//! coordinator.refresh();
//! spawner.run_all();
//! coordinator.poll();
//!
//! coordinator.edit("a=2").unwrap();
//! clock.advance_ms(3000);
//! coordinator.poll(); // debounce elapsed: validate + dispatch write
//! spawner.run_all();
//! coordinator.poll(); // apply the write result
//!
//! let session = coordinator.session().unwrap();
//! assert_eq!(session.state(), SessionState::Clean);
//! assert_eq!(session.baseline(), "a=2");
//! assert_eq!(session.artifact().version, 4);
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::confirm::{DiscardConfirmation, PendingChanges, RefuseDiscard};
use crate::dispatch::{Spawner, ThreadSpawner};
use crate::error::CoordinatorError;
use crate::events::{SessionEvent, SessionEventCallback};
use crate::gateway::{Gateway, GatewayError, RemoteFetchError};
use crate::model::{Artifact, ArtifactId, ArtifactKind, HistoryEntry};
use crate::session::{EditorSession, InFlightSave, SaveFailure, SaveOrigin, SessionState};
use crate::tree::{PathTree, build_tree};
use crate::validation::{Rejection, Validator};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Result of a manual save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    /// Validation passed and a write was dispatched.
    Started,
    /// A write is already in flight; this request runs after it resolves.
    Queued,
    /// The buffer equals the baseline.
    NothingToSave,
    /// Validation failed; nothing was written.
    Rejected(Rejection),
}

/// Result of a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A new session was opened.
    Selected,
    /// The artifact was already selected; nothing changed.
    AlreadySelected,
    /// Pending changes exist and discarding them was not confirmed.
    Declined,
}

enum Completion {
    Listed {
        /// `change_seq` when the listing was dispatched.
        seq: u64,
        result: Result<Vec<Artifact>, GatewayError>,
    },
    Written {
        generation: u64,
        artifact_id: ArtifactId,
        content: String,
        origin: SaveOrigin,
        result: Result<Artifact, GatewayError>,
    },
    History {
        generation: u64,
        artifact_id: ArtifactId,
        result: Result<Vec<HistoryEntry>, GatewayError>,
    },
    Fetched {
        generation: u64,
        artifact_id: ArtifactId,
        path: String,
        /// Buffer when the pull was dispatched.
        buffer: String,
        result: Result<String, RemoteFetchError>,
    },
    Created {
        path: String,
        result: Result<Artifact, GatewayError>,
    },
    Deleted {
        artifact_id: ArtifactId,
        result: Result<(), GatewayError>,
    },
}

/// A store result this coordinator applied itself. `None` means the artifact is gone.
struct LocalChange {
    seq: u64,
    artifact: Option<Artifact>,
}

/// The editor session coordinator.
pub struct Coordinator {
    gateway: Arc<dyn Gateway>,
    validator: Arc<dyn Validator>,
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn Spawner>,
    confirmation: Box<dyn DiscardConfirmation>,
    config: SessionConfig,
    artifacts: Vec<Artifact>,
    session: Option<EditorSession>,
    generation: u64,
    outstanding: usize,
    refresh_in_flight: bool,
    change_seq: u64,
    local_changes: HashMap<ArtifactId, LocalChange>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    callbacks: Vec<SessionEventCallback>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("artifact_count", &self.artifacts.len())
            .field("session", &self.session.as_ref().map(|s| (&s.artifact.id, s.state)))
            .field("generation", &self.generation)
            .field("outstanding", &self.outstanding)
            .field("callback_count", &self.callbacks.len())
            .finish()
    }
}

impl Coordinator {
    /// Create a coordinator with the system clock, background threads for gateway calls, a
    /// confirmation that never discards, and default [`SessionConfig`].
    pub fn new(gateway: Arc<dyn Gateway>, validator: Arc<dyn Validator>) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            gateway,
            validator,
            clock: Arc::new(SystemClock),
            spawner: Arc::new(ThreadSpawner::new()),
            confirmation: Box::new(RefuseDiscard),
            config: SessionConfig::default(),
            artifacts: Vec::new(),
            session: None,
            generation: 0,
            outstanding: 0,
            refresh_in_flight: false,
            change_seq: 0,
            local_changes: HashMap::new(),
            completion_tx,
            completion_rx,
            callbacks: Vec::new(),
        }
    }

    /// Use `clock` as the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run gateway calls on `spawner`.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Ask `confirmation` before discarding pending changes.
    pub fn with_confirmation(mut self, confirmation: impl DiscardConfirmation + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    /// Replace the session configuration (applies to sessions opened afterwards).
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribe to session events.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Artifact list as last reported by the store (plus local create/save results).
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Look up a listed artifact by id.
    pub fn artifact(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == id)
    }

    /// Look up a listed artifact by path.
    pub fn find_by_path(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// The current session.
    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    /// Folder/file tree of the artifact list.
    pub fn tree(&self) -> PathTree<ArtifactId> {
        build_tree(self.artifacts.iter().map(|a| (a.path.as_str(), a.id.clone())))
    }

    /// When the next `poll()` has timer work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(EditorSession::autosave_deadline)
    }

    /// No gateway call outstanding and no timer armed.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.next_deadline().is_none()
    }

    /// Leaving the current session would lose something.
    pub fn has_pending_changes(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(EditorSession::has_pending_changes)
    }

    /// Reload the artifact list from the store.
    pub fn refresh(&mut self) {
        if self.refresh_in_flight {
            return;
        }
        self.refresh_in_flight = true;
        let seq = self.change_seq;
        tracing::debug!(seq, "listing artifacts");
        self.dispatch(move |gateway| Completion::Listed {
            seq,
            result: gateway.list_artifacts(),
        });
    }

    /// Select an artifact, replacing the current session.
    ///
    /// If the current session has pending changes the confirmation capability is asked first, and
    /// the session survives unless it confirms.
    pub fn select(&mut self, id: &ArtifactId) -> Result<SelectOutcome, CoordinatorError> {
        let Some(artifact) = self.artifact(id).cloned() else {
            return Err(CoordinatorError::UnknownArtifact(id.clone()));
        };
        if let Some(session) = self.session.as_ref()
            && &session.artifact.id == id
            && !session.is_orphaned()
        {
            return Ok(SelectOutcome::AlreadySelected);
        }
        if !self.confirm_leave() {
            return Ok(SelectOutcome::Declined);
        }
        self.open_session(artifact);
        Ok(SelectOutcome::Selected)
    }

    /// Replace the working buffer.
    pub fn edit(&mut self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        let now = self.clock.now();
        let autosave_enabled = self.config.autosave_enabled;
        let session = self.session.as_mut().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }

        session.buffer = text.into();
        session.rejection = None;

        let needs_write = match session.in_flight.as_ref() {
            Some(in_flight) => session.buffer != in_flight.content,
            None => session.is_dirty(),
        };
        if needs_write && autosave_enabled {
            session.autosave.rearm(now);
        } else {
            session.autosave.cancel();
        }

        self.settle_buffer_state();
        Ok(())
    }

    /// Validate and write the buffer now.
    pub fn save(&mut self) -> Result<SaveRequest, CoordinatorError> {
        let session = self.session.as_mut().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }
        if session.in_flight.is_some() {
            session.queue_save(SaveOrigin::Manual);
            tracing::debug!(artifact = %session.artifact.id, "save queued behind in-flight write");
            return Ok(SaveRequest::Queued);
        }
        if !session.is_dirty() {
            return Ok(SaveRequest::NothingToSave);
        }
        Ok(self.begin_save(SaveOrigin::Manual))
    }

    /// Throw away buffer changes and return to the baseline.
    pub fn discard(&mut self) -> Result<(), CoordinatorError> {
        let session = self.session.as_mut().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }
        session.buffer = session.baseline.clone();
        session.rejection = None;
        session.autosave.cancel();
        session.queued_save = None;
        self.settle_buffer_state();
        Ok(())
    }

    /// Request the session artifact's history (`history_limit` entries, newest first).
    pub fn load_history(&mut self) -> Result<(), CoordinatorError> {
        let limit = self.config.history_limit;
        let session = self.session.as_mut().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }
        if session.history_loading {
            return Ok(());
        }
        session.history_loading = true;

        let generation = session.generation;
        let artifact_id = session.artifact.id.clone();
        self.dispatch(move |gateway| {
            let result = gateway.read_history(&artifact_id, limit);
            Completion::History {
                generation,
                artifact_id,
                result,
            }
        });
        Ok(())
    }

    /// Load the content of a loaded history entry into the buffer. Nothing is written.
    pub fn restore(&mut self, version: u64) -> Result<(), CoordinatorError> {
        let session = self.session.as_ref().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }
        let history = session
            .history
            .as_ref()
            .ok_or(CoordinatorError::HistoryNotLoaded)?;
        let entry = history
            .iter()
            .find(|entry| entry.version == version)
            .ok_or(CoordinatorError::UnknownVersion(version))?;

        let content = entry.content.clone();
        let artifact_id = session.artifact.id.clone();
        self.load_into_buffer(content);
        tracing::debug!(artifact = %artifact_id, version, "history entry restored into buffer");
        self.notify(SessionEvent::Restored {
            artifact_id,
            version,
        });
        Ok(())
    }

    /// Pull reference content into the buffer. Defaults to the artifact's own path.
    pub fn pull_remote(&mut self, path: Option<&str>) -> Result<(), CoordinatorError> {
        let session = self.session.as_mut().ok_or(CoordinatorError::NoSession)?;
        if session.is_orphaned() {
            return Err(CoordinatorError::Orphaned(session.artifact.id.clone()));
        }
        let path = path
            .map(str::to_string)
            .unwrap_or_else(|| session.artifact.path.clone());
        if path.trim().is_empty() {
            return Err(CoordinatorError::EmptyPath);
        }
        session.pull_in_flight = Some(path.clone());

        let generation = session.generation;
        let artifact_id = session.artifact.id.clone();
        let buffer = session.buffer.clone();
        tracing::debug!(artifact = %artifact_id, %path, "pulling remote reference");
        self.dispatch(move |gateway| {
            let result = gateway.fetch_remote_reference(&path);
            Completion::Fetched {
                generation,
                artifact_id,
                buffer,
                path,
                result,
            }
        });
        Ok(())
    }

    /// Create an artifact in the store.
    pub fn create(
        &mut self,
        path: &str,
        name: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<(), CoordinatorError> {
        let path = path.trim().to_string();
        if path.is_empty() {
            return Err(CoordinatorError::EmptyPath);
        }
        let name = name.to_string();
        let content = content.to_string();
        self.dispatch(move |gateway| {
            let result = gateway.create_artifact(&path, &name, kind, &content);
            Completion::Created { path, result }
        });
        Ok(())
    }

    /// Delete an artifact from the store. A session on it becomes [`SessionState::Orphaned`].
    pub fn delete(&mut self, id: &ArtifactId) -> Result<(), CoordinatorError> {
        if self.artifact(id).is_none() {
            return Err(CoordinatorError::UnknownArtifact(id.clone()));
        }
        let artifact_id = id.clone();
        self.dispatch(move |gateway| {
            let result = gateway.delete_artifact(&artifact_id);
            Completion::Deleted {
                artifact_id,
                result,
            }
        });
        Ok(())
    }

    /// Apply finished gateway calls, then run autosave if its deadline has passed.
    ///
    /// Returns the number of gateway results applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            self.apply(completion);
            applied += 1;
        }
        self.fire_autosave_if_due();
        applied
    }

    fn dispatch<F>(&mut self, call: F)
    where
        F: FnOnce(&dyn Gateway) -> Completion + Send + 'static,
    {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.completion_tx.clone();
        let call = Arc::new(Mutex::new(Some(call)));
        let job_call = Arc::clone(&call);
        self.outstanding += 1;
        let spawned = self.spawner.spawn(Box::new(move || {
            let Some(call) = take_call(&job_call) else {
                return;
            };
            let completion = call(gateway.as_ref());
            // The coordinator may be gone; nobody is left to care.
            let _ = tx.send(completion);
        }));

        if let Err(err) = spawned {
            tracing::error!("failed to schedule gateway call: {err}");
            // Resolved on the next poll like any other store failure.
            if let Some(call) = take_call(&call) {
                let completion = call(&Unreachable(err.to_string()));
                let _ = self.completion_tx.send(completion);
            }
        }
    }

    fn notify(&mut self, event: SessionEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }

    fn set_state(&mut self, to: SessionState) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let from = session.state;
        if from == to {
            return;
        }
        session.state = to;
        let artifact_id = session.artifact.id.clone();
        tracing::debug!(artifact = %artifact_id, %from, %to, "session state changed");
        self.notify(SessionEvent::StateChanged {
            artifact_id,
            from,
            to,
        });
    }

    /// Derive `Clean`/`Dirty` from the buffer unless a write or orphaning pins the state.
    fn settle_buffer_state(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.in_flight.is_some() || session.is_orphaned() {
            return;
        }
        let to = if session.is_dirty() {
            SessionState::Dirty
        } else {
            SessionState::Clean
        };
        self.set_state(to);
    }

    fn confirm_leave(&mut self) -> bool {
        let Some(session) = self.session.as_ref() else {
            return true;
        };
        if !session.has_pending_changes() {
            return true;
        }
        let pending = PendingChanges {
            artifact_id: session.artifact.id.clone(),
            path: session.artifact.path.clone(),
            state: session.state,
            unsaved_buffer: session.is_dirty(),
            save_in_flight: session.in_flight.is_some(),
        };
        let confirmed = self.confirmation.confirm_discard(&pending);
        if !confirmed {
            tracing::debug!(artifact = %pending.artifact_id, "discard not confirmed");
        }
        confirmed
    }

    fn open_session(&mut self, artifact: Artifact) {
        self.close_session();
        self.generation += 1;
        let session = EditorSession::open(self.generation, artifact, self.config.autosave_delay());
        let artifact_id = session.artifact.id.clone();
        self.session = Some(session);
        tracing::debug!(artifact = %artifact_id, generation = self.generation, "session opened");
        self.notify(SessionEvent::SessionOpened { artifact_id });
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.autosave.cancel();
            self.notify(SessionEvent::SessionClosed {
                artifact_id: session.artifact.id,
            });
        }
    }

    fn begin_save(&mut self, origin: SaveOrigin) -> SaveRequest {
        let Some(session) = self.session.as_mut() else {
            return SaveRequest::NothingToSave;
        };
        session.autosave.cancel();
        session.queued_save = None;
        let kind = session.artifact.kind;
        let buffer = session.buffer.clone();
        let artifact_id = session.artifact.id.clone();
        let generation = session.generation;

        self.set_state(SessionState::Validating);
        if let Err(rejection) = self.validator.validate(kind, &buffer) {
            if let Some(session) = self.session.as_mut() {
                session.rejection = Some(rejection.clone());
            }
            tracing::debug!(artifact = %artifact_id, ?origin, %rejection, "buffer rejected");
            self.set_state(SessionState::Rejected);
            self.notify(SessionEvent::Rejected {
                artifact_id,
                origin,
                rejection: rejection.clone(),
            });
            return SaveRequest::Rejected(rejection);
        }

        if let Some(session) = self.session.as_mut() {
            session.in_flight = Some(InFlightSave {
                content: buffer.clone(),
                origin,
            });
        }
        self.set_state(SessionState::Saving);

        let editor = self.config.editor_identity.clone();
        tracing::debug!(artifact = %artifact_id, ?origin, "dispatching write");
        self.dispatch(move |gateway| {
            let result = gateway.write_artifact(&artifact_id, &buffer, &editor);
            Completion::Written {
                generation,
                artifact_id,
                content: buffer,
                origin,
                result,
            }
        });
        SaveRequest::Started
    }

    fn fire_autosave_if_due(&mut self) {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.autosave.fire_if_due(now) {
            return;
        }
        if session.in_flight.is_some() {
            session.queue_save(SaveOrigin::Auto);
            return;
        }
        if session.state != SessionState::Dirty || !session.is_dirty() {
            return;
        }
        tracing::debug!(artifact = %session.artifact.id, "autosave timer elapsed");
        self.begin_save(SaveOrigin::Auto);
    }

    /// Settle the session after its in-flight write resolved and replay a coalesced request.
    fn after_write_resolved(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let queued = session.queued_save.take();
        if !session.is_dirty() {
            session.autosave.cancel();
            self.set_state(SessionState::Clean);
            return;
        }
        self.set_state(SessionState::Dirty);
        if let Some(origin) = queued {
            self.begin_save(origin);
        }
    }

    fn load_into_buffer(&mut self, content: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.buffer = content;
        session.rejection = None;
        // Loaded content is only persisted by an explicit save.
        session.autosave.cancel();
        session.queued_save = None;
        self.settle_buffer_state();
    }

    fn orphan_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_orphaned() {
            return;
        }
        session.autosave.cancel();
        session.queued_save = None;
        let artifact_id = session.artifact.id.clone();
        tracing::warn!(artifact = %artifact_id, "selected artifact no longer exists");
        self.set_state(SessionState::Orphaned);
        self.notify(SessionEvent::Orphaned { artifact_id });
    }

    fn current_generation(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    fn upsert_artifact(&mut self, artifact: Artifact) {
        match self.artifacts.iter_mut().find(|a| a.id == artifact.id) {
            Some(existing) => {
                if artifact.version >= existing.version {
                    *existing = artifact;
                }
            }
            None => {
                self.artifacts.push(artifact);
                self.artifacts.sort_by(|a, b| a.path.cmp(&b.path));
            }
        }
    }

    fn remove_artifact(&mut self, id: &ArtifactId) {
        self.artifacts.retain(|a| &a.id != id);
    }

    fn record_change(&mut self, id: ArtifactId, artifact: Option<Artifact>) {
        self.change_seq += 1;
        self.local_changes.insert(
            id,
            LocalChange {
                seq: self.change_seq,
                artifact,
            },
        );
    }

    /// Re-apply creates, writes and deletes the store confirmed after a listing was dispatched.
    fn replay_local_changes(&mut self, listing_seq: u64) {
        self.local_changes.retain(|_, change| change.seq > listing_seq);
        let newer: Vec<(ArtifactId, Option<Artifact>)> = self
            .local_changes
            .iter()
            .map(|(id, change)| (id.clone(), change.artifact.clone()))
            .collect();
        for (id, artifact) in newer {
            tracing::debug!(artifact = %id, "listing predates a local change");
            match artifact {
                Some(artifact) => self.upsert_artifact(artifact),
                None => self.remove_artifact(&id),
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Listed { seq, result } => {
                self.refresh_in_flight = false;
                self.apply_listing(seq, result);
            }
            Completion::Written {
                generation,
                artifact_id,
                content,
                origin,
                result,
            } => self.apply_write(generation, artifact_id, content, origin, result),
            Completion::History {
                generation,
                artifact_id,
                result,
            } => self.apply_history(generation, artifact_id, result),
            Completion::Fetched {
                generation,
                artifact_id,
                path,
                buffer,
                result,
            } => self.apply_fetch(generation, artifact_id, path, buffer, result),
            Completion::Created { path, result } => self.apply_created(path, result),
            Completion::Deleted {
                artifact_id,
                result,
            } => self.apply_deleted(artifact_id, result),
        }
    }

    fn apply_listing(&mut self, seq: u64, result: Result<Vec<Artifact>, GatewayError>) {
        let list = match result {
            Ok(list) => list,
            Err(error) => {
                tracing::warn!("listing artifacts failed: {error}");
                self.notify(SessionEvent::RefreshFailed { error });
                return;
            }
        };

        self.artifacts = list;
        self.replay_local_changes(seq);
        let count = self.artifacts.len();
        tracing::debug!(count, "artifact list refreshed");
        self.notify(SessionEvent::ArtifactsRefreshed { count });

        self.reconcile_session_with_list();

        if self.session.is_none()
            && let Some(first) = self.artifacts.first().cloned()
        {
            self.open_session(first);
        }
    }

    fn reconcile_session_with_list(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.is_orphaned() {
            return;
        }
        let Some(listed) = self.artifact(&session.artifact.id).cloned() else {
            self.orphan_session();
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // A listing dispatched before our own write resolved must not roll metadata back.
        if listed.version < session.artifact.version {
            return;
        }
        let untouched = !session.is_dirty()
            && session.in_flight.is_none()
            && session.pull_in_flight.is_none();
        if untouched && listed.content != session.baseline {
            tracing::debug!(artifact = %listed.id, version = listed.version, "adopting newer store content");
            session.baseline = listed.content.clone();
            session.buffer = listed.content.clone();
        }
        session.artifact = listed;
    }

    fn apply_write(
        &mut self,
        generation: u64,
        artifact_id: ArtifactId,
        content: String,
        origin: SaveOrigin,
        result: Result<Artifact, GatewayError>,
    ) {
        match &result {
            Ok(updated) => {
                self.upsert_artifact(updated.clone());
                self.record_change(artifact_id.clone(), Some(updated.clone()));
            }
            Err(error) if error.is_not_found() => {
                self.remove_artifact(&artifact_id);
                self.record_change(artifact_id.clone(), None);
            }
            Err(_) => {}
        }
        if !self.current_generation(generation) {
            tracing::debug!(artifact = %artifact_id, "write resolved for a closed session");
            return;
        }
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.in_flight = None;
        if session.is_orphaned() {
            return;
        }

        match result {
            Ok(updated) => {
                let version = updated.version;
                session.baseline = content;
                session.artifact = updated;
                session.last_saved_at = Some(now);
                session.last_failure = None;
                tracing::info!(artifact = %artifact_id, version, ?origin, "artifact saved");
                self.notify(SessionEvent::Saved {
                    artifact_id,
                    origin,
                    version,
                });
                self.after_write_resolved();
            }
            Err(error) if error.is_not_found() => {
                self.orphan_session();
            }
            Err(error) => {
                session.last_failure = Some(SaveFailure {
                    origin,
                    error: error.clone(),
                });
                if origin.surfaces_failure() {
                    tracing::warn!(artifact = %artifact_id, "save failed: {error}");
                } else {
                    tracing::debug!(artifact = %artifact_id, "autosave failed: {error}");
                }
                self.set_state(SessionState::SaveFailed);
                self.notify(SessionEvent::SaveFailed {
                    artifact_id,
                    origin,
                    error,
                });
                self.after_write_resolved();
            }
        }
    }

    fn apply_history(
        &mut self,
        generation: u64,
        artifact_id: ArtifactId,
        result: Result<Vec<HistoryEntry>, GatewayError>,
    ) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.generation == generation)
        else {
            return;
        };
        session.history_loading = false;

        match result {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.version.cmp(&a.version));
                let count = entries.len();
                session.history = Some(entries);
                self.notify(SessionEvent::HistoryLoaded { artifact_id, count });
            }
            Err(error) if error.is_not_found() => {
                self.remove_artifact(&artifact_id);
                self.record_change(artifact_id, None);
                self.orphan_session();
            }
            Err(error) => {
                tracing::warn!(artifact = %artifact_id, "reading history failed: {error}");
                self.notify(SessionEvent::HistoryFailed { artifact_id, error });
            }
        }
    }

    fn apply_fetch(
        &mut self,
        generation: u64,
        artifact_id: ArtifactId,
        path: String,
        buffer_at_dispatch: String,
        result: Result<String, RemoteFetchError>,
    ) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.generation == generation)
        else {
            return;
        };
        session.pull_in_flight = None;
        if session.is_orphaned() {
            return;
        }

        let edited_meanwhile = session.buffer != buffer_at_dispatch;

        match result {
            Ok(_) if edited_meanwhile => {
                tracing::debug!(artifact = %artifact_id, %path, "buffer edited during pull, keeping edits");
                self.notify(SessionEvent::RemotePullSuperseded { artifact_id, path });
            }
            Ok(text) => {
                self.load_into_buffer(text);
                tracing::debug!(artifact = %artifact_id, %path, "remote reference loaded into buffer");
                self.notify(SessionEvent::RemotePulled { artifact_id, path });
            }
            Err(error) => {
                tracing::warn!(artifact = %artifact_id, %path, "remote pull failed: {error}");
                self.notify(SessionEvent::RemoteFetchFailed {
                    artifact_id,
                    path,
                    error,
                });
            }
        }
    }

    fn apply_created(&mut self, path: String, result: Result<Artifact, GatewayError>) {
        match result {
            Ok(artifact) => {
                tracing::info!(artifact = %artifact.id, path = %artifact.path, "artifact created");
                self.upsert_artifact(artifact.clone());
                self.record_change(artifact.id.clone(), Some(artifact.clone()));
                self.notify(SessionEvent::Created {
                    artifact_id: artifact.id.clone(),
                    path: artifact.path.clone(),
                });
                if !self.has_pending_changes() {
                    self.open_session(artifact);
                }
            }
            Err(error) => {
                tracing::warn!(%path, "creating artifact failed: {error}");
                self.notify(SessionEvent::CreateFailed { path, error });
            }
        }
    }

    fn apply_deleted(&mut self, artifact_id: ArtifactId, result: Result<(), GatewayError>) {
        match result {
            Ok(()) | Err(GatewayError::NotFound(_)) => {
                tracing::info!(artifact = %artifact_id, "artifact deleted");
                self.remove_artifact(&artifact_id);
                self.record_change(artifact_id.clone(), None);
                if self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.artifact.id == artifact_id)
                {
                    self.orphan_session();
                }
                self.notify(SessionEvent::Deleted { artifact_id });
            }
            Err(error) => {
                tracing::warn!(artifact = %artifact_id, "deleting artifact failed: {error}");
                self.notify(SessionEvent::DeleteFailed { artifact_id, error });
            }
        }
    }
}

fn take_call<F>(slot: &Mutex<Option<F>>) -> Option<F> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Answers every call with the reason the real store could not be reached.
struct Unreachable(String);

impl Gateway for Unreachable {
    fn list_artifacts(&self) -> Result<Vec<Artifact>, GatewayError> {
        Err(GatewayError::Unavailable(self.0.clone()))
    }

    fn read_history(
        &self,
        _id: &ArtifactId,
        _limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        Err(GatewayError::Unavailable(self.0.clone()))
    }

    fn write_artifact(
        &self,
        _id: &ArtifactId,
        _content: &str,
        _editor: &str,
    ) -> Result<Artifact, GatewayError> {
        Err(GatewayError::Unavailable(self.0.clone()))
    }

    fn create_artifact(
        &self,
        _path: &str,
        _name: &str,
        _kind: ArtifactKind,
        _content: &str,
    ) -> Result<Artifact, GatewayError> {
        Err(GatewayError::Unavailable(self.0.clone()))
    }

    fn delete_artifact(&self, _id: &ArtifactId) -> Result<(), GatewayError> {
        Err(GatewayError::Unavailable(self.0.clone()))
    }

    fn fetch_remote_reference(&self, _path: &str) -> Result<String, RemoteFetchError> {
        Err(RemoteFetchError::Network(self.0.clone()))
    }
}
