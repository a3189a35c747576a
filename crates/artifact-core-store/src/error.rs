use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing the JSON store document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The document is not a valid store.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// Rendering the document failed.
    #[error("failed to render store: {0}")]
    Render(#[from] serde_json::Error),
    /// Writing the document (or its temp file) failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}
