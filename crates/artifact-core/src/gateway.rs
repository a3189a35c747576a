//! Persistence gateway contract.
//!
//! The gateway is the only boundary between the coordinator and the external store. Transport,
//! authentication and schema are the implementor's business; the coordinator relies only on the
//! call contract below.
//!
//! Calls are blocking from the implementor's point of view. The coordinator never calls them on
//! the host's thread: every call is shipped to a [`crate::Spawner`] and its result is applied on
//! the next [`crate::Coordinator::poll`].

use crate::model::{Artifact, ArtifactId, ArtifactKind, HistoryEntry};
use thiserror::Error;

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The artifact does not exist (anymore).
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),
    /// Another artifact already uses this path.
    #[error("path '{0}' already exists")]
    PathExists(String),
    /// The store could not be reached or refused the call; retrying may succeed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store failed to persist or read data.
    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// Whether this error means the artifact is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Remote reference pull failures. Never mapped to empty content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFetchError {
    /// The source has no content at this path.
    #[error("remote reference '{0}' not found")]
    NotFound(String),
    /// The source could not be reached or returned an unexpected response.
    #[error("remote fetch failed: {0}")]
    Network(String),
    /// This gateway has no remote source configured.
    #[error("no remote reference source configured")]
    Unsupported,
}

/// Capability contract the coordinator requires from the persistent store.
pub trait Gateway: Send + Sync {
    /// List all artifacts (the coordinator keeps the store's order).
    fn list_artifacts(&self) -> Result<Vec<Artifact>, GatewayError>;

    /// Read up to `limit` history entries for `id`, most recent first.
    fn read_history(&self, id: &ArtifactId, limit: usize)
    -> Result<Vec<HistoryEntry>, GatewayError>;

    /// Atomically replace the content of `id`.
    ///
    /// On success the store has bumped the version and recorded history, and returns the updated
    /// artifact. On failure nothing changed.
    fn write_artifact(
        &self,
        id: &ArtifactId,
        content: &str,
        editor: &str,
    ) -> Result<Artifact, GatewayError>;

    /// Create a new artifact at version 1.
    fn create_artifact(
        &self,
        path: &str,
        name: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<Artifact, GatewayError>;

    /// Delete an artifact and its history.
    fn delete_artifact(&self, id: &ArtifactId) -> Result<(), GatewayError>;

    /// Read-only pull of reference content from the external source.
    fn fetch_remote_reference(&self, path: &str) -> Result<String, RemoteFetchError>;
}
