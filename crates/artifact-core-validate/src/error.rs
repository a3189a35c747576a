use artifact_core::ArtifactKind;
use thiserror::Error;

/// Errors produced while building a [`crate::ValidationPipeline`].
#[derive(Debug, Error)]
pub enum ValidationSetupError {
    /// Loading a Tree-sitter grammar failed (ABI mismatch).
    #[error("tree-sitter language error for {kind}: {message}")]
    Language {
        /// Kind whose grammar failed to load.
        kind: ArtifactKind,
        /// Underlying error.
        message: String,
    },
    /// A denylist pattern did not compile.
    #[error("denylist pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
