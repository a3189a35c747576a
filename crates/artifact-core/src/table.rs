//! Reference artifact table.
//!
//! [`ArtifactTable`] implements the store-side semantics of the gateway contract on plain data:
//! unique paths, store-assigned versions, and a history snapshot of the previous revision on every
//! write. Backends wrap it with their own locking and persistence (see [`crate::MemoryGateway`]).
//!
//! All mutating methods either apply fully or leave the table untouched.

use crate::gateway::GatewayError;
use crate::model::{Artifact, ArtifactId, ArtifactKind, HistoryEntry, UNKNOWN_EDITOR};
use serde::{Deserialize, Serialize};

/// Plain artifact + history storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTable {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    artifacts: Vec<Artifact>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl ArtifactTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the table holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// All artifacts, ordered by path.
    pub fn list(&self) -> Vec<Artifact> {
        let mut list = self.artifacts.clone();
        list.sort_by(|a, b| a.path.cmp(&b.path));
        list
    }

    /// Look up an artifact by id.
    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.id == id)
    }

    /// Look up an artifact by path.
    pub fn find_by_path(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    /// Up to `limit` history entries for `id`, most recent version first.
    pub fn history(&self, id: &ArtifactId, limit: usize) -> Result<Vec<HistoryEntry>, GatewayError> {
        if self.get(id).is_none() {
            return Err(GatewayError::NotFound(id.clone()));
        }
        let mut entries: Vec<HistoryEntry> = self
            .history
            .iter()
            .filter(|h| &h.artifact_id == id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Create an artifact at version 1.
    pub fn create(
        &mut self,
        path: &str,
        name: &str,
        kind: ArtifactKind,
        content: &str,
        now_ms: u64,
    ) -> Result<Artifact, GatewayError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(GatewayError::Storage("artifact path must not be empty".to_string()));
        }
        if self.find_by_path(path).is_some() {
            return Err(GatewayError::PathExists(path.to_string()));
        }

        self.next_id = self.next_id.saturating_add(1);
        let name = if name.trim().is_empty() {
            path.rsplit('/').next().unwrap_or(path)
        } else {
            name
        };
        let artifact = Artifact {
            id: ArtifactId::new(format!("art-{}", self.next_id)),
            path: path.to_string(),
            name: name.to_string(),
            kind,
            content: content.to_string(),
            version: 1,
            updated_at: now_ms,
            updated_by: UNKNOWN_EDITOR.to_string(),
        };
        self.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    /// Replace the content of `id`, snapshotting the previous revision into history.
    pub fn write(
        &mut self,
        id: &ArtifactId,
        content: &str,
        editor: &str,
        now_ms: u64,
    ) -> Result<Artifact, GatewayError> {
        let Some(index) = self.artifacts.iter().position(|a| &a.id == id) else {
            return Err(GatewayError::NotFound(id.clone()));
        };

        self.next_id = self.next_id.saturating_add(1);
        let previous = &self.artifacts[index];
        let snapshot = HistoryEntry {
            id: format!("hist-{}", self.next_id),
            artifact_id: previous.id.clone(),
            version: previous.version,
            content: previous.content.clone(),
            created_at: previous.updated_at,
            created_by: previous.updated_by.clone(),
            change_note: None,
        };

        let editor = if editor.trim().is_empty() {
            UNKNOWN_EDITOR
        } else {
            editor
        };
        let artifact = &mut self.artifacts[index];
        artifact.content = content.to_string();
        artifact.version = artifact.version.saturating_add(1);
        artifact.updated_at = now_ms;
        artifact.updated_by = editor.to_string();
        let updated = artifact.clone();

        self.history.push(snapshot);
        Ok(updated)
    }

    /// Delete `id` and its history.
    pub fn delete(&mut self, id: &ArtifactId) -> Result<(), GatewayError> {
        let Some(index) = self.artifacts.iter().position(|a| &a.id == id) else {
            return Err(GatewayError::NotFound(id.clone()));
        };
        self.artifacts.remove(index);
        self.history.retain(|h| &h.artifact_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_assigns_version_one_and_rejects_duplicate_paths() {
        let mut table = ArtifactTable::new();
        let a = table
            .create("site/app.js", "", ArtifactKind::JavaScript, "a=1", 10)
            .unwrap();
        assert_eq!(a.version, 1);
        assert_eq!(a.name, "app.js");
        assert_eq!(a.updated_by, UNKNOWN_EDITOR);

        let err = table
            .create("site/app.js", "dup", ArtifactKind::JavaScript, "", 11)
            .unwrap_err();
        assert_eq!(err, GatewayError::PathExists("site/app.js".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_write_bumps_version_and_snapshots_previous_revision() {
        let mut table = ArtifactTable::new();
        let a = table.create("a.js", "a", ArtifactKind::JavaScript, "v1", 10).unwrap();

        let updated = table.write(&a.id, "v2", "alice", 20).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.updated_by, "alice");
        assert_eq!(updated.updated_at, 20);

        table.write(&a.id, "v3", "", 30).unwrap();
        let history = table.history(&a.id, 10).unwrap();
        let versions: Vec<u64> = history.iter().map(|h| h.version).collect();
        assert_eq!(versions, vec![2, 1]);
        assert_eq!(history[0].content, "v2");
        assert_eq!(history[0].created_by, "alice");
        assert_eq!(history[1].content, "v1");
        assert_eq!(table.get(&a.id).unwrap().updated_by, UNKNOWN_EDITOR);
    }

    #[test]
    fn test_history_respects_limit_and_missing_artifact() {
        let mut table = ArtifactTable::new();
        let a = table.create("a.js", "a", ArtifactKind::JavaScript, "0", 0).unwrap();
        for i in 1..=5 {
            table.write(&a.id, &i.to_string(), "bob", i).unwrap();
        }
        assert_eq!(table.history(&a.id, 2).unwrap().len(), 2);
        assert_eq!(table.history(&a.id, 2).unwrap()[0].version, 5);

        let missing = ArtifactId::new("nope");
        assert_eq!(
            table.history(&missing, 2).unwrap_err(),
            GatewayError::NotFound(missing)
        );
    }

    #[test]
    fn test_delete_removes_history_and_is_not_repeatable() {
        let mut table = ArtifactTable::new();
        let a = table.create("a.js", "a", ArtifactKind::JavaScript, "0", 0).unwrap();
        table.write(&a.id, "1", "bob", 1).unwrap();
        table.delete(&a.id).unwrap();
        assert!(table.is_empty());
        assert!(table.history.is_empty());
        assert!(table.delete(&a.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_is_ordered_by_path() {
        let mut table = ArtifactTable::new();
        table.create("z.js", "", ArtifactKind::JavaScript, "", 0).unwrap();
        table.create("a/b.css", "", ArtifactKind::Css, "", 0).unwrap();
        let paths: Vec<String> = table.list().into_iter().map(|a| a.path).collect();
        assert_eq!(paths, vec!["a/b.css".to_string(), "z.js".to_string()]);
    }
}
