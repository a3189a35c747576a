//! Unsafe-construct denylist.

use crate::position::line_column;
use regex::Regex;

/// One denylisted construct.
#[derive(Debug, Clone)]
pub struct DenyRule {
    regex: Regex,
    label: String,
    description: String,
}

impl DenyRule {
    /// Compile a rule. `label` names the construct (`"eval()"`), `description` says what it is.
    pub fn new(
        pattern: &str,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            label: label.into(),
            description: description.into(),
        })
    }

    /// Short construct name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// What the construct does.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Regex source.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Byte offset of the first match.
    pub fn find(&self, text: &str) -> Option<usize> {
        self.regex.find(text).map(|m| m.start())
    }
}

/// A match of a [`DenyRule`].
#[derive(Debug, Clone, Copy)]
pub struct DenyMatch<'a> {
    /// Rule that matched.
    pub rule: &'a DenyRule,
    /// 1-based line of the match.
    pub line: usize,
    /// 1-based column of the match.
    pub column: usize,
}

impl DenyMatch<'_> {
    /// Human-readable description for a rejection.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}) at {}:{}",
            self.rule.label, self.rule.description, self.line, self.column
        )
    }
}

/// Ordered rule set. The first rule (in order) that matches anywhere wins.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    rules: Vec<DenyRule>,
}

impl Denylist {
    /// Build a denylist from explicit rules.
    pub fn new(rules: Vec<DenyRule>) -> Self {
        Self { rules }
    }

    /// The standard rule set:
    ///
    /// 1. `eval(`
    /// 2. `new Function`
    /// 3. `setTimeout` / `setInterval` with a string argument
    /// 4. `<script` tags
    /// 5. `document.write(` / `document.writeln(`
    /// 6. `.innerHTML =` / `.outerHTML =` (including `+=`)
    pub fn standard() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            DenyRule::new(r"eval\s*\(", "eval()", "dynamic code evaluation")?,
            DenyRule::new(
                r"\bnew\s+Function\b",
                "new Function()",
                "dynamic function construction",
            )?,
            DenyRule::new(
                r#"\bset(?:Timeout|Interval)\s*\(\s*["'`]"#,
                "setTimeout/setInterval(string)",
                "string-argument timer scheduling",
            )?,
            DenyRule::new(r"(?i)<\s*script\b", "<script>", "embedded script tag")?,
            DenyRule::new(
                r"\bdocument\s*\.\s*write(?:ln)?\s*\(",
                "document.write()",
                "direct DOM write",
            )?,
            DenyRule::new(
                r"\.(?:inner|outer)HTML\s*\+?=(?:[^=]|$)",
                ".innerHTML/.outerHTML assignment",
                "unguarded markup injection",
            )?,
        ]))
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[DenyRule] {
        &self.rules
    }

    /// First rule that matches `text`.
    pub fn scan<'a>(&'a self, text: &str) -> Option<DenyMatch<'a>> {
        self.rules.iter().find_map(|rule| {
            let offset = rule.find(text)?;
            let (line, column) = line_column(text, offset);
            Some(DenyMatch { rule, line, column })
        })
    }
}
