//! Validation verdicts and the validator contract.
//!
//! A [`Validator`] is a pure function of `(kind, text)`: it performs no I/O and never touches
//! session state. The coordinator calls the same validator for autosave and manual save and
//! decides what to do with the verdict.

use crate::model::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a buffer was rejected. A verdict, not a failure: it blocks persistence only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rejection {
    /// The text does not parse as a self-contained unit of the artifact's language.
    SyntaxError {
        /// Parser-facing description, including a 1-based `line:column`.
        detail: String,
    },
    /// The text contains a denylisted construct.
    UnsafePattern {
        /// Description of the first matching pattern.
        pattern: String,
    },
}

impl Rejection {
    /// Short category label (`"syntax"` / `"unsafe"`).
    pub fn category(&self) -> &'static str {
        match self {
            Self::SyntaxError { .. } => "syntax",
            Self::UnsafePattern { .. } => "unsafe",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError { detail } => write!(f, "syntax error: {detail}"),
            Self::UnsafePattern { pattern } => write!(f, "unsafe pattern: {pattern}"),
        }
    }
}

/// Gate run before every write.
pub trait Validator: Send + Sync {
    /// Accept `text` for an artifact of `kind`, or say why not.
    fn validate(&self, kind: ArtifactKind, text: &str) -> Result<(), Rejection>;
}

impl<F> Validator for F
where
    F: Fn(ArtifactKind, &str) -> Result<(), Rejection> + Send + Sync,
{
    fn validate(&self, kind: ArtifactKind, text: &str) -> Result<(), Rejection> {
        self(kind, text)
    }
}
