//! Coordinator API errors.
//!
//! These report misuse of the coordinator API (no session, unknown ids, ...). Validation and store
//! failures are never returned here: they become session state and [`crate::SessionEvent`]s.

use crate::model::ArtifactId;
use thiserror::Error;

/// Errors returned by [`crate::Coordinator`] commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// No artifact is selected.
    #[error("no artifact is selected")]
    NoSession,
    /// The id is not in the current artifact list.
    #[error("unknown artifact {0}")]
    UnknownArtifact(ArtifactId),
    /// The selected artifact no longer exists; select another one.
    #[error("artifact {0} no longer exists; select another artifact")]
    Orphaned(ArtifactId),
    /// History has not been loaded for this session.
    #[error("history has not been loaded")]
    HistoryNotLoaded,
    /// The loaded history has no entry with this version.
    #[error("no history entry for version {0}")]
    UnknownVersion(u64),
    /// A path argument was empty.
    #[error("artifact path must not be empty")]
    EmptyPath,
}
