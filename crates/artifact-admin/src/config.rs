//! Console configuration file.
//!
//! An optional JSON document; every field has a default and command-line flags override it.
//!
//! ```json
//! {
//!   "session": { "autosave_delay_ms": 3000, "editor_identity": "alice" },
//!   "store_path": "artifacts.json",
//!   "reference_base_url": "https://cdn.example.com/site",
//!   "log": "artifact_core=debug"
//! }
//! ```

use artifact_core::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default store document when neither the file nor the flags name one.
pub const DEFAULT_STORE_PATH: &str = "artifacts.json";

/// Default log filter when `ARTIFACT_ADMIN_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Console configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Coordinator tuning.
    pub session: SessionConfig,
    /// JSON store document.
    pub store_path: Option<PathBuf>,
    /// Base URL for remote reference pulls.
    pub reference_base_url: Option<String>,
    /// Local directory for remote reference pulls (used when no URL is set).
    pub reference_dir: Option<PathBuf>,
    /// Log filter (`tracing_subscriber::EnvFilter` syntax).
    pub log: Option<String>,
}

impl AdminConfig {
    /// Load `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Store document path, falling back to [`DEFAULT_STORE_PATH`].
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    /// Log filter, falling back to [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self) -> &str {
        self.log.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AdminConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.store_path(), PathBuf::from("artifacts.json"));
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");
        fs::write(
            &path,
            r#"{ "session": { "autosave_delay_ms": 500 }, "store_path": "/tmp/s.json" }"#,
        )
        .unwrap();

        let config = AdminConfig::load(&path).unwrap();
        assert_eq!(config.session.autosave_delay_ms, 500);
        assert_eq!(config.session.history_limit, 20);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/s.json"));
        assert_eq!(config.reference_base_url, None);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");
        fs::write(&path, "{ session: ").unwrap();

        let err = AdminConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("admin.json"));
    }
}
