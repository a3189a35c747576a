//! Tree-sitter structural check.

use crate::error::ValidationSetupError;
use crate::position::line_column;
use artifact_core::{ArtifactKind, Rejection};
use std::sync::{Mutex, PoisonError};
use tree_sitter::{Language, Node, Parser};

fn language_for(kind: ArtifactKind) -> Option<Language> {
    match kind {
        ArtifactKind::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        ArtifactKind::Json => Some(tree_sitter_json::LANGUAGE.into()),
        ArtifactKind::Css => Some(tree_sitter_css::LANGUAGE.into()),
        ArtifactKind::Html => Some(tree_sitter_html::LANGUAGE.into()),
        ArtifactKind::Text => None,
    }
}

/// Checks that a buffer parses as a self-contained unit of its kind's language.
///
/// One parser is kept per kind. Parsers are not `Sync`, so each sits behind a mutex; checks for
/// different kinds never contend.
pub struct StructuralCheck {
    parsers: Vec<(ArtifactKind, Mutex<Parser>)>,
}

impl std::fmt::Debug for StructuralCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<ArtifactKind> = self.parsers.iter().map(|(kind, _)| *kind).collect();
        f.debug_struct("StructuralCheck")
            .field("kinds", &kinds)
            .finish()
    }
}

impl StructuralCheck {
    /// Load a grammar for every kind that has one.
    pub fn new() -> Result<Self, ValidationSetupError> {
        let mut parsers = Vec::new();
        for kind in ArtifactKind::ALL {
            let Some(language) = language_for(kind) else {
                continue;
            };
            let mut parser = Parser::new();
            parser
                .set_language(&language)
                .map_err(|e| ValidationSetupError::Language {
                    kind,
                    message: e.to_string(),
                })?;
            parsers.push((kind, Mutex::new(parser)));
        }
        Ok(Self { parsers })
    }

    /// Whether `kind` is checked at all.
    pub fn covers(&self, kind: ArtifactKind) -> bool {
        self.parsers.iter().any(|(k, _)| *k == kind)
    }

    /// Parse `text` as `kind` and report the first syntax problem.
    pub fn check(&self, kind: ArtifactKind, text: &str) -> Result<(), Rejection> {
        let Some((_, parser)) = self.parsers.iter().find(|(k, _)| *k == kind) else {
            return Ok(());
        };
        let mut parser = parser.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tree) = parser.parse(text, None) else {
            parser.reset();
            return Err(Rejection::SyntaxError {
                detail: "parser gave up".to_string(),
            });
        };

        let root = tree.root_node();
        if let Some(node) = first_error(root) {
            return Err(Rejection::SyntaxError {
                detail: describe(node, text),
            });
        }
        if kind == ArtifactKind::Json {
            check_single_json_value(root, text)?;
        }
        Ok(())
    }
}

/// First `ERROR` or `MISSING` node in document order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Only subtrees that contain an error are worth entering.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn describe(node: Node<'_>, text: &str) -> String {
    let (line, column) = line_column(text, node.start_byte());
    if node.is_missing() {
        format!("missing {:?} at {line}:{column}", node.kind())
    } else {
        format!("unexpected token at {line}:{column}")
    }
}

/// The JSON grammar accepts any number of top-level values; a document holds exactly one.
fn check_single_json_value(root: Node<'_>, text: &str) -> Result<(), Rejection> {
    let mut cursor = root.walk();
    let values: Vec<Node<'_>> = root
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    match values.as_slice() {
        [_] => Ok(()),
        [] => Err(Rejection::SyntaxError {
            detail: "empty document".to_string(),
        }),
        [_, second, ..] => {
            let (line, column) = line_column(text, second.start_byte());
            Err(Rejection::SyntaxError {
                detail: format!("unexpected second value at {line}:{column}"),
            })
        }
    }
}
