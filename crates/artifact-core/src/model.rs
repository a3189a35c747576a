//! Artifact and history records.
//!
//! These mirror the record schema exposed by the persistent store:
//!
//! - artifact: `{id, path, name, kind, content, version, updated_at, updated_by}`
//! - history: `{id, artifact_id, version, content, created_at, created_by, change_note?}`
//!
//! Timestamps are Unix milliseconds. Versions are assigned by the store only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity recorded when the editor identity is not known.
pub const UNKNOWN_EDITOR: &str = "unknown";

/// Opaque, stable artifact identifier (assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a store-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Content category of an artifact (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// JavaScript source.
    JavaScript,
    /// JSON document.
    Json,
    /// CSS stylesheet.
    Css,
    /// HTML fragment or page.
    Html,
    /// Plain text (no structural check).
    Text,
}

impl ArtifactKind {
    /// All kinds, in display order.
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::JavaScript,
        ArtifactKind::Json,
        ArtifactKind::Css,
        ArtifactKind::Html,
        ArtifactKind::Text,
    ];

    /// Lowercase name used in records and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Json => "json",
            Self::Css => "css",
            Self::Html => "html",
            Self::Text => "text",
        }
    }

    /// Guess the kind from a path's extension. Unknown extensions map to [`ArtifactKind::Text`].
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return Self::Text;
        };
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "json" => Self::Json,
            "css" => Self::Css,
            "html" | "htm" => Self::Html,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "javascript" | "js" => Ok(Self::JavaScript),
            "json" => Ok(Self::Json),
            "css" => Ok(Self::Css),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("unknown artifact kind '{s}'")),
        }
    }
}

/// A named, versioned text resource held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable identifier.
    pub id: ArtifactId,
    /// Slash-delimited path, unique among artifacts.
    pub path: String,
    /// Display name.
    pub name: String,
    /// Content category.
    pub kind: ArtifactKind,
    /// Current persisted content.
    pub content: String,
    /// Store-assigned version (starts at 1).
    pub version: u64,
    /// Last modification time (Unix milliseconds).
    pub updated_at: u64,
    /// Identity of the last editor, or [`UNKNOWN_EDITOR`].
    pub updated_by: String,
}

/// Immutable snapshot of an artifact at a past version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry identifier.
    pub id: String,
    /// Owning artifact.
    pub artifact_id: ArtifactId,
    /// Artifact version captured by this snapshot.
    pub version: u64,
    /// Content at that version.
    pub content: String,
    /// Snapshot creation time (Unix milliseconds).
    pub created_at: u64,
    /// Identity that produced the captured version.
    pub created_by: String,
    /// Optional note attached by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_note: Option<String>,
}

/// Milliseconds since the Unix epoch for `time` (0 for times before the epoch).
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
