//! Core types for conversion diagnostics.

use crate::rules::model::RuleId;
use ampfit_dom::NodeId;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, the document was adjusted silently.
    Info,
    /// Warning that should be reviewed.
    Warning,
    /// Error: the output is not a valid document.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A rule is violated and could not be repaired.
    ValidatorError,
    /// A soft rule (such as `unique_warning`) is violated.
    ValidatorWarning,
    /// An attribute was removed because its value is not allowed.
    AttributeStripped,
    /// A deprecated tag or attribute is in use.
    DeprecationNotice,
    /// A mandatory tag could not be fully synthesized.
    SynthesisError,
    /// A synthesized tag had nowhere to go.
    InsertionError,
}

impl DiagnosticKind {
    /// Returns true for kinds that mean the output is not valid.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::ValidatorError | Self::SynthesisError | Self::InsertionError
        )
    }

    /// Returns the severity of this kind.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ValidatorError | Self::SynthesisError | Self::InsertionError => Severity::Error,
            Self::ValidatorWarning => Severity::Warning,
            Self::AttributeStripped | Self::DeprecationNotice => Severity::Info,
        }
    }

    /// Returns the kebab-case name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidatorError => "validator-error",
            Self::ValidatorWarning => "validator-warning",
            Self::AttributeStripped => "attribute-stripped",
            Self::DeprecationNotice => "deprecation",
            Self::SynthesisError => "synthesis-error",
            Self::InsertionError => "insertion-error",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of a rule a diagnostic was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "kebab-case")]
pub enum Cause {
    /// The tag rule as a whole.
    Tag,
    /// An attribute rule, by name.
    Attribute(String),
    /// A property inside a structured attribute, by name.
    Property(String),
    /// A disallowed ancestor tag was found.
    DisallowedAncestor(String),
    /// A `requires` dependency id nobody satisfies.
    Requirement(String),
    /// The custom stylesheet exceeds the size budget.
    StylesheetBudget {
        /// Size after minification, in bytes.
        size: usize,
        /// Configured budget, in bytes.
        budget: usize,
    },
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::Attribute(name) => write!(f, "attribute `{name}`"),
            Self::Property(name) => write!(f, "property `{name}`"),
            Self::DisallowedAncestor(name) => write!(f, "ancestor <{}>", name.to_lowercase()),
            Self::Requirement(id) => write!(f, "requirement `{id}`"),
            Self::StylesheetBudget { size, budget } => {
                write!(f, "stylesheet {size} bytes > {budget} bytes")
            }
        }
    }
}

/// One finding collected during a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// Offending node, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
    /// Originating rule, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    /// Display name of the originating rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    /// What part of the rule is concerned.
    pub cause: Cause,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with no node or rule attached.
    #[must_use]
    pub fn new(kind: DiagnosticKind, cause: Cause, message: impl Into<String>) -> Self {
        Self {
            kind,
            node: None,
            rule: None,
            rule_name: None,
            cause,
            message: message.into(),
        }
    }

    /// Attaches the offending node.
    #[must_use]
    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attaches the originating rule.
    #[must_use]
    pub fn from_rule(mut self, rule: RuleId, name: impl Into<String>) -> Self {
        self.rule = Some(rule);
        self.rule_name = Some(name.into());
        self
    }

    /// Returns the severity implied by the kind.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Returns true if the diagnostic is fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.severity(), self.kind)?;
        if let Some(name) = &self.rule_name {
            write!(f, " {name}")?;
        }
        write!(f, ": {} ({})", self.message, self.cause)
    }
}

/// Ordered collection of diagnostics for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Returns the diagnostics in the order they were recorded.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Iterates over the diagnostics.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any diagnostic is fatal.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_fatal)
    }

    /// Returns diagnostics of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| d.kind == kind).collect()
    }

    /// Counts diagnostics by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| {
            self.entries
                .iter()
                .filter(|d| d.severity() == severity)
                .count()
        };
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Formats diagnostics at or above `min` as a multi-line report.
    #[must_use]
    pub fn format_report(&self, min: Severity) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        for d in self.entries.iter().filter(|d| d.severity() >= min) {
            let _ = writeln!(report, "{d}");
        }

        let (errors, warnings, infos) = self.count_by_severity();
        let _ = writeln!(
            report,
            "Total: {errors} error(s), {warnings} warning(s), {infos} info(s)"
        );
        report
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::AttributeStripped,
            Cause::Attribute("target".into()),
            "value `_new` does not match",
        ));
        diagnostics.push(
            Diagnostic::new(DiagnosticKind::ValidatorWarning, Cause::Tag, "duplicate")
                .at(NodeId::ROOT),
        );
        diagnostics
    }

    #[test]
    fn fatal_kinds() {
        assert!(DiagnosticKind::ValidatorError.is_fatal());
        assert!(DiagnosticKind::SynthesisError.is_fatal());
        assert!(DiagnosticKind::InsertionError.is_fatal());
        assert!(!DiagnosticKind::ValidatorWarning.is_fatal());
        assert!(!DiagnosticKind::AttributeStripped.is_fatal());
        assert!(!DiagnosticKind::DeprecationNotice.is_fatal());
    }

    #[test]
    fn counts_and_fatal_flag() {
        let mut diagnostics = sample();
        assert_eq!(diagnostics.count_by_severity(), (0, 1, 1));
        assert!(!diagnostics.has_fatal());

        diagnostics.push(Diagnostic::new(
            DiagnosticKind::InsertionError,
            Cause::Tag,
            "no <body>",
        ));
        assert!(diagnostics.has_fatal());
        assert_eq!(diagnostics.of_kind(DiagnosticKind::InsertionError).len(), 1);
    }

    #[test]
    fn report_filters_by_severity() {
        let report = sample().format_report(Severity::Warning);
        assert!(report.contains("warning[validator-warning]: duplicate (tag)"));
        assert!(!report.contains("attribute-stripped"));
        assert!(report.contains("Total: 0 error(s), 1 warning(s), 1 info(s)"));
    }

    #[test]
    fn display_includes_rule_name() {
        let d = Diagnostic::new(
            DiagnosticKind::ValidatorError,
            Cause::Attribute("charset".into()),
            "mandatory attribute is missing",
        )
        .from_rule(crate::rules::load_rules("").unwrap().tags()[0].id(), "meta charset=utf-8");
        assert_eq!(
            d.to_string(),
            "error[validator-error] meta charset=utf-8: mandatory attribute is missing (attribute `charset`)"
        );
    }
}
