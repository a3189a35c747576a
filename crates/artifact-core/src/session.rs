//! Per-artifact editor session.
//!
//! An [`EditorSession`] exists only while an artifact is selected. It owns the working buffer, the
//! baseline it is compared against, the autosave [`DebounceTimer`], and bookkeeping for the write
//! in flight. Only the [`crate::Coordinator`] mutates it; hosts get read-only access.

use crate::debounce::DebounceTimer;
use crate::gateway::GatewayError;
use crate::model::{Artifact, HistoryEntry};
use crate::validation::Rejection;
use std::fmt;
use std::time::{Duration, Instant};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Buffer equals baseline.
    Clean,
    /// Buffer differs from baseline; no rejection recorded.
    Dirty,
    /// Running the validator (transient).
    Validating,
    /// A write is in flight.
    Saving,
    /// The last write failed (transient, followed by `Dirty` or `Clean`).
    SaveFailed,
    /// The validator rejected the buffer; the reason is retained.
    Rejected,
    /// The artifact vanished from the store. Terminal: saves are refused, the buffer is kept.
    Orphaned,
}

impl SessionState {
    /// Lowercase label for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Validating => "validating",
            Self::Saving => "saving",
            Self::SaveFailed => "save-failed",
            Self::Rejected => "rejected",
            Self::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which write path started a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveOrigin {
    /// The user asked for it.
    Manual,
    /// The debounce timer elapsed.
    Auto,
}

impl SaveOrigin {
    /// Whether a failure on this path must be shown to the user.
    pub fn surfaces_failure(self) -> bool {
        matches!(self, Self::Manual)
    }

    fn merge(current: Option<SaveOrigin>, incoming: SaveOrigin) -> SaveOrigin {
        match (current, incoming) {
            (Some(Self::Manual), _) | (_, Self::Manual) => Self::Manual,
            _ => Self::Auto,
        }
    }
}

/// The last failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    /// Which path failed.
    pub origin: SaveOrigin,
    /// Store error.
    pub error: GatewayError,
}

#[derive(Debug, Clone)]
pub(crate) struct InFlightSave {
    pub(crate) content: String,
    pub(crate) origin: SaveOrigin,
}

/// State for the selected artifact.
#[derive(Debug, Clone)]
pub struct EditorSession {
    pub(crate) generation: u64,
    pub(crate) artifact: Artifact,
    pub(crate) buffer: String,
    pub(crate) baseline: String,
    pub(crate) state: SessionState,
    pub(crate) rejection: Option<Rejection>,
    pub(crate) last_failure: Option<SaveFailure>,
    pub(crate) in_flight: Option<InFlightSave>,
    pub(crate) queued_save: Option<SaveOrigin>,
    pub(crate) autosave: DebounceTimer,
    pub(crate) last_saved_at: Option<Instant>,
    pub(crate) history: Option<Vec<HistoryEntry>>,
    pub(crate) history_loading: bool,
    pub(crate) pull_in_flight: Option<String>,
}

impl EditorSession {
    pub(crate) fn open(generation: u64, artifact: Artifact, autosave_delay: Duration) -> Self {
        let baseline = artifact.content.clone();
        Self {
            generation,
            buffer: baseline.clone(),
            baseline,
            artifact,
            state: SessionState::Clean,
            rejection: None,
            last_failure: None,
            in_flight: None,
            queued_save: None,
            autosave: DebounceTimer::new(autosave_delay),
            last_saved_at: None,
            history: None,
            history_loading: false,
            pull_in_flight: None,
        }
    }

    /// The selected artifact as last reported by the store.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Working buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Last persisted or loaded content.
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Buffer differs from baseline.
    pub fn is_dirty(&self) -> bool {
        self.buffer != self.baseline
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Retained rejection (only while [`SessionState::Rejected`]).
    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    /// Last failed write, cleared by the next successful one.
    pub fn last_failure(&self) -> Option<&SaveFailure> {
        self.last_failure.as_ref()
    }

    /// A write is in flight.
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Content of the write in flight.
    pub fn saving_content(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|s| s.content.as_str())
    }

    /// A save request is waiting for the in-flight write to resolve.
    pub fn queued_save(&self) -> Option<SaveOrigin> {
        self.queued_save
    }

    /// When autosave will run if nothing else happens.
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// When the last successful write resolved.
    pub fn last_saved_at(&self) -> Option<Instant> {
        self.last_saved_at
    }

    /// Loaded history (most recent first), if requested.
    pub fn history(&self) -> Option<&[HistoryEntry]> {
        self.history.as_deref()
    }

    /// A history load is in flight.
    pub fn is_history_loading(&self) -> bool {
        self.history_loading
    }

    /// Path of the remote pull in flight.
    pub fn pull_in_flight(&self) -> Option<&str> {
        self.pull_in_flight.as_deref()
    }

    /// Session artifact vanished upstream.
    pub fn is_orphaned(&self) -> bool {
        self.state == SessionState::Orphaned
    }

    /// Leaving this session would lose something.
    pub fn has_pending_changes(&self) -> bool {
        self.is_dirty() || self.in_flight.is_some()
    }

    pub(crate) fn queue_save(&mut self, origin: SaveOrigin) {
        self.queued_save = Some(SaveOrigin::merge(self.queued_save, origin));
    }
}
