//! Remote reference sources.

use artifact_core::RemoteFetchError;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Where remote reference copies come from.
pub trait ReferenceSource: Send + Sync {
    /// Fetch the reference text stored at `path`.
    fn fetch(&self, path: &str) -> Result<String, RemoteFetchError>;
}

/// No remote source configured; every pull fails with [`RemoteFetchError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferenceSource;

impl ReferenceSource for NoReferenceSource {
    fn fetch(&self, _path: &str) -> Result<String, RemoteFetchError> {
        Err(RemoteFetchError::Unsupported)
    }
}

const USER_AGENT: &str = concat!("artifact-core-store/", env!("CARGO_PKG_VERSION"));

/// Fetches `<base_url>/<path>` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReferenceSource {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpReferenceSource {
    /// Create a source with a 15 second timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    /// Create a source with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    /// Base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL fetched for `path`.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl ReferenceSource for HttpReferenceSource {
    fn fetch(&self, path: &str) -> Result<String, RemoteFetchError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "fetching remote reference");
        let response = match self.agent.get(&url).set("User-Agent", USER_AGENT).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(RemoteFetchError::NotFound(path.to_string()));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(RemoteFetchError::Network(format!("HTTP {code} from {url}")));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(RemoteFetchError::Network(transport.to_string()));
            }
        };
        response
            .into_string()
            .map_err(|e| RemoteFetchError::Network(format!("failed to read body from {url}: {e}")))
    }
}

/// Reads `<root>/<path>` from a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryReferenceSource {
    root: PathBuf,
}

impl DirectoryReferenceSource {
    /// Serve references from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` below the root. Paths that could escape it resolve to `None`.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        (depth > 0).then_some(resolved)
    }
}

impl ReferenceSource for DirectoryReferenceSource {
    fn fetch(&self, path: &str) -> Result<String, RemoteFetchError> {
        let Some(file) = self.resolve(path) else {
            tracing::warn!(%path, "refusing reference path outside the root");
            return Err(RemoteFetchError::NotFound(path.to_string()));
        };
        std::fs::read_to_string(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RemoteFetchError::NotFound(path.to_string()),
            _ => RemoteFetchError::Network(format!("failed to read {}: {e}", file.display())),
        })
    }
}
