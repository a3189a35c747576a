//! JSON document store.
//!
//! The whole store (artifacts, history, id counter) lives in one JSON document. Each mutation is
//! applied to a copy of the table, the copy is written to `<file>.tmp`, fsynced and renamed over
//! the document, and only then swapped in. A failed write leaves both the file and the in-memory
//! table untouched.

use crate::error::StoreError;
use crate::reference::{NoReferenceSource, ReferenceSource};
use artifact_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactTable, Gateway, GatewayError, HistoryEntry,
    RemoteFetchError, unix_millis,
};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// A [`Gateway`] backed by a JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<ArtifactTable>,
    references: Box<dyn ReferenceSource>,
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("artifact_count", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; nothing is written until the
    /// first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => ArtifactTable::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.clone(),
                    source,
                });
            }
        };
        tracing::info!(path = %path.display(), artifacts = table.len(), "opened artifact store");
        Ok(Self {
            path,
            table: Mutex::new(table),
            references: Box::new(NoReferenceSource),
        })
    }

    /// Serve remote reference pulls from `source`.
    pub fn with_references(mut self, source: impl ReferenceSource + 'static) -> Self {
        self.references = Box::new(source);
        self
    }

    /// Document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ArtifactTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ArtifactTable) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut table = self.lock();
        let mut next = table.clone();
        let value = op(&mut next)?;
        persist(&self.path, &next).map_err(|e| {
            tracing::warn!("persisting artifact store failed: {e}");
            GatewayError::Storage(e.to_string())
        })?;
        *table = next;
        Ok(value)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifacts.json"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Write { path, source }
}

fn persist(path: &Path, table: &ArtifactTable) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(table)?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_error(dir))?;
    }

    let tmp = temp_path(path);
    let mut file = File::create(&tmp).map_err(write_error(&tmp))?;
    file.write_all(&data).map_err(write_error(&tmp))?;
    file.sync_all().map_err(write_error(&tmp))?;
    drop(file);

    fs::rename(&tmp, path).map_err(write_error(path))?;

    #[cfg(unix)]
    {
        if let Some(dir) = path.parent()
            && let Ok(dir) = File::open(dir)
        {
            let _ = dir.sync_all();
        }
    }

    tracing::debug!(path = %path.display(), bytes = data.len(), "artifact store persisted");
    Ok(())
}

fn now_ms() -> u64 {
    unix_millis(SystemTime::now())
}

impl Gateway for JsonFileStore {
    fn list_artifacts(&self) -> Result<Vec<Artifact>, GatewayError> {
        Ok(self.lock().list())
    }

    fn read_history(
        &self,
        id: &ArtifactId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.lock().history(id, limit)
    }

    fn write_artifact(
        &self,
        id: &ArtifactId,
        content: &str,
        editor: &str,
    ) -> Result<Artifact, GatewayError> {
        self.mutate(|table| table.write(id, content, editor, now_ms()))
    }

    fn create_artifact(
        &self,
        path: &str,
        name: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<Artifact, GatewayError> {
        self.mutate(|table| table.create(path, name, kind, content, now_ms()))
    }

    fn delete_artifact(&self, id: &ArtifactId) -> Result<(), GatewayError> {
        self.mutate(|table| table.delete(id))
    }

    fn fetch_remote_reference(&self, path: &str) -> Result<String, RemoteFetchError> {
        self.references.fetch(path)
    }
}
