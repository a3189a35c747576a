//! The two-step validation pipeline.

use crate::denylist::Denylist;
use crate::error::ValidationSetupError;
use crate::structure::StructuralCheck;
use artifact_core::{ArtifactKind, Rejection, Validator};

/// Structural check, then denylist scan. First failure wins.
#[derive(Debug)]
pub struct ValidationPipeline {
    structure: StructuralCheck,
    denylist: Denylist,
}

impl ValidationPipeline {
    /// Create a pipeline with every grammar and the standard denylist.
    pub fn new() -> Result<Self, ValidationSetupError> {
        Ok(Self {
            structure: StructuralCheck::new()?,
            denylist: Denylist::standard()?,
        })
    }

    /// Replace the denylist.
    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    /// Active denylist.
    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Validate `text` as an artifact of `kind`.
    pub fn validate(&self, kind: ArtifactKind, text: &str) -> Result<(), Rejection> {
        self.structure.check(kind, text)?;
        if let Some(found) = self.denylist.scan(text) {
            tracing::trace!(%kind, rule = found.rule.label(), "denylist match");
            return Err(Rejection::UnsafePattern {
                pattern: found.describe(),
            });
        }
        Ok(())
    }
}

impl Validator for ValidationPipeline {
    fn validate(&self, kind: ArtifactKind, text: &str) -> Result<(), Rejection> {
        ValidationPipeline::validate(self, kind, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denylist::DenyRule;

    #[test]
    fn test_syntax_error_wins_over_unsafe_pattern() {
        let pipeline = ValidationPipeline::new().unwrap();
        let verdict = pipeline.validate(ArtifactKind::JavaScript, "eval(");
        assert!(matches!(verdict, Err(Rejection::SyntaxError { .. })), "{verdict:?}");
    }

    #[test]
    fn test_eval_call_in_valid_javascript_is_unsafe() {
        let pipeline = ValidationPipeline::new().unwrap();
        let source = "function load(code) {\n  return medieval(code) + 1;\n}\n";
        assert_eq!(
            pipeline.validate(ArtifactKind::JavaScript, source),
            Err(Rejection::UnsafePattern {
                pattern: "eval() (dynamic code evaluation) at 2:14".to_string()
            })
        );
    }

    #[test]
    fn test_denylist_applies_to_every_kind() {
        let pipeline = ValidationPipeline::new().unwrap();
        for kind in [ArtifactKind::Text, ArtifactKind::Html] {
            let verdict = pipeline.validate(kind, "<p>hi</p><script>x()</script>");
            assert!(matches!(verdict, Err(Rejection::UnsafePattern { .. })), "{kind}: {verdict:?}");
        }
        let verdict = pipeline.validate(ArtifactKind::Json, r#"{"html": "<script>"}"#);
        assert!(matches!(verdict, Err(Rejection::UnsafePattern { .. })));
    }

    #[test]
    fn test_custom_denylist() {
        let pipeline = ValidationPipeline::new()
            .unwrap()
            .with_denylist(Denylist::new(vec![
                DenyRule::new(r"\bdebugger\b", "debugger", "debugger statement").unwrap(),
            ]));
        assert_eq!(pipeline.denylist().rules().len(), 1);
        assert!(pipeline.validate(ArtifactKind::JavaScript, "debugger;").is_err());
        assert_eq!(pipeline.validate(ArtifactKind::JavaScript, "eval(1);"), Ok(()));
    }
}
