//! Session event notifications.
//!
//! Hosts never poll state synchronously to find out what happened: they subscribe a callback and
//! react to [`SessionEvent`]s as the coordinator emits them.

use crate::gateway::{GatewayError, RemoteFetchError};
use crate::model::ArtifactId;
use crate::session::{SaveOrigin, SessionState};
use crate::validation::Rejection;

/// Something the host may want to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was created for `artifact_id`.
    SessionOpened {
        /// Selected artifact.
        artifact_id: ArtifactId,
    },
    /// The session for `artifact_id` was destroyed.
    SessionClosed {
        /// Previously selected artifact.
        artifact_id: ArtifactId,
    },
    /// The session moved between states.
    StateChanged {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
    },
    /// A write succeeded.
    Saved {
        /// Saved artifact.
        artifact_id: ArtifactId,
        /// Write path.
        origin: SaveOrigin,
        /// Store-assigned version.
        version: u64,
    },
    /// A write failed.
    SaveFailed {
        /// Target artifact.
        artifact_id: ArtifactId,
        /// Write path; manual failures must be shown to the user.
        origin: SaveOrigin,
        /// Store error.
        error: GatewayError,
    },
    /// The validator rejected the buffer; nothing was written.
    Rejected {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Write path that ran validation.
        origin: SaveOrigin,
        /// Reason.
        rejection: Rejection,
    },
    /// History arrived.
    HistoryLoaded {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Number of entries.
        count: usize,
    },
    /// History could not be read.
    HistoryFailed {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Store error.
        error: GatewayError,
    },
    /// A history entry was loaded into the buffer (not saved).
    Restored {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Restored version.
        version: u64,
    },
    /// Remote reference content was loaded into the buffer (not saved).
    RemotePulled {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Remote path.
        path: String,
    },
    /// A remote pull finished after the buffer was edited; the edits were kept and the pulled
    /// content dropped.
    RemotePullSuperseded {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Remote path.
        path: String,
    },
    /// A remote pull failed; the buffer is unchanged.
    RemoteFetchFailed {
        /// Session artifact.
        artifact_id: ArtifactId,
        /// Remote path.
        path: String,
        /// Fetch error.
        error: RemoteFetchError,
    },
    /// The artifact list was replaced.
    ArtifactsRefreshed {
        /// Number of artifacts.
        count: usize,
    },
    /// Listing artifacts failed.
    RefreshFailed {
        /// Store error.
        error: GatewayError,
    },
    /// The session's artifact vanished; the session is now terminal.
    Orphaned {
        /// Vanished artifact.
        artifact_id: ArtifactId,
    },
    /// An artifact was created.
    Created {
        /// New artifact.
        artifact_id: ArtifactId,
        /// Its path.
        path: String,
    },
    /// Creating an artifact failed.
    CreateFailed {
        /// Requested path.
        path: String,
        /// Store error.
        error: GatewayError,
    },
    /// An artifact was deleted.
    Deleted {
        /// Deleted artifact.
        artifact_id: ArtifactId,
    },
    /// Deleting an artifact failed.
    DeleteFailed {
        /// Target artifact.
        artifact_id: ArtifactId,
        /// Store error.
        error: GatewayError,
    },
}

/// Event callback function type
pub type SessionEventCallback = Box<dyn FnMut(&SessionEvent) + Send>;
