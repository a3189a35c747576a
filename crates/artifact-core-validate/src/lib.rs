#![warn(missing_docs)]
//! `artifact-core-validate` - Validation pipeline for `artifact-core`.
//!
//! [`ValidationPipeline`] implements [`artifact_core::Validator`] in two ordered steps, the first
//! failure winning:
//!
//! 1. [`StructuralCheck`]: the buffer must parse as a self-contained unit of the artifact's
//!    language (Tree-sitter grammars for JavaScript, JSON, CSS and HTML; plain text always passes)
//! 2. [`Denylist`]: an ordered set of unsafe-construct patterns, applied to every kind
//!
//! Both steps are pure: the same `(kind, text)` always produces the same verdict.
//!
//! ```rust
//! use artifact_core::{ArtifactKind, Rejection};
//! use artifact_core_validate::ValidationPipeline;
//!
//! let pipeline = ValidationPipeline::new().unwrap();
//! assert_eq!(pipeline.validate(ArtifactKind::JavaScript, "let a = 2;"), Ok(()));
//! assert!(matches!(
//!     pipeline.validate(ArtifactKind::JavaScript, r#"eval("x")"#),
//!     Err(Rejection::UnsafePattern { .. })
//! ));
//! assert!(matches!(
//!     pipeline.validate(ArtifactKind::Json, r#"{"a": }"#),
//!     Err(Rejection::SyntaxError { .. })
//! ));
//! ```

mod denylist;
mod error;
mod pipeline;
mod position;
mod structure;

pub use denylist::{DenyMatch, DenyRule, Denylist};
pub use error::ValidationSetupError;
pub use pipeline::ValidationPipeline;
pub use structure::StructuralCheck;
