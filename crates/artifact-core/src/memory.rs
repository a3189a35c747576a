//! In-memory gateway.
//!
//! [`MemoryGateway`] is a thread-safe [`Gateway`] over an [`ArtifactTable`]. It is used by the
//! admin console's demo mode and by tests, which is why it can inject failures and count calls.

use crate::gateway::{Gateway, GatewayError, RemoteFetchError};
use crate::model::{Artifact, ArtifactId, ArtifactKind, HistoryEntry, unix_millis};
use crate::table::ArtifactTable;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct MemoryState {
    table: ArtifactTable,
    references: HashMap<String, String>,
    write_failures: VecDeque<GatewayError>,
    write_calls: usize,
    fetch_calls: usize,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an artifact directly. The name is the last path segment.
    pub fn seed(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<Artifact, GatewayError> {
        self.lock()
            .table
            .create(path, "", kind, content, unix_millis(SystemTime::now()))
    }

    /// Create an artifact and rewrite it until it reaches `version`.
    pub fn seed_at_version(
        &self,
        path: &str,
        kind: ArtifactKind,
        content: &str,
        version: u64,
    ) -> Result<Artifact, GatewayError> {
        let mut artifact = self.seed(path, kind, content)?;
        let mut state = self.lock();
        while artifact.version < version {
            artifact = state.table.write(
                &artifact.id,
                content,
                &artifact.updated_by,
                unix_millis(SystemTime::now()),
            )?;
        }
        Ok(artifact)
    }

    /// Make `content` available as remote reference `path`.
    pub fn insert_reference(&self, path: impl Into<String>, content: impl Into<String>) {
        self.lock().references.insert(path.into(), content.into());
    }

    /// Fail the next write call with `error` (queued failures are consumed in order).
    pub fn fail_next_write(&self, error: GatewayError) {
        self.lock().write_failures.push_back(error);
    }

    /// Remove an artifact behind the coordinator's back (simulates another admin).
    pub fn remove_externally(&self, id: &ArtifactId) -> bool {
        self.lock().table.delete(id).is_ok()
    }

    /// Number of `write_artifact` calls received (including failed ones).
    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    /// Number of `fetch_remote_reference` calls received.
    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }

    /// Current stored copy of an artifact.
    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        self.lock().table.get(id).cloned()
    }

    /// Current stored copy of the artifact at `path`.
    pub fn find_by_path(&self, path: &str) -> Option<Artifact> {
        self.lock().table.find_by_path(path).cloned()
    }
}

impl Gateway for MemoryGateway {
    fn list_artifacts(&self) -> Result<Vec<Artifact>, GatewayError> {
        Ok(self.lock().table.list())
    }

    fn read_history(
        &self,
        id: &ArtifactId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.lock().table.history(id, limit)
    }

    fn write_artifact(
        &self,
        id: &ArtifactId,
        content: &str,
        editor: &str,
    ) -> Result<Artifact, GatewayError> {
        let mut state = self.lock();
        state.write_calls += 1;
        if let Some(error) = state.write_failures.pop_front() {
            return Err(error);
        }
        state
            .table
            .write(id, content, editor, unix_millis(SystemTime::now()))
    }

    fn create_artifact(
        &self,
        path: &str,
        name: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<Artifact, GatewayError> {
        self.lock()
            .table
            .create(path, name, kind, content, unix_millis(SystemTime::now()))
    }

    fn delete_artifact(&self, id: &ArtifactId) -> Result<(), GatewayError> {
        self.lock().table.delete(id)
    }

    fn fetch_remote_reference(&self, path: &str) -> Result<String, RemoteFetchError> {
        let mut state = self.lock();
        state.fetch_calls += 1;
        state
            .references
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteFetchError::NotFound(path.to_string()))
    }
}
