//! Per-conversion state.

use crate::rules::model::RuleId;
use crate::stylesheet::StyleMap;
use crate::types::{Diagnostic, Diagnostics};
use ampfit_dom::{Document, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dependency ids asserted by matched rules.
///
/// Later assertions of the same id overwrite earlier ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyLedger {
    requires: BTreeMap<String, RuleId>,
    satisfies: BTreeMap<String, RuleId>,
}

impl DependencyLedger {
    /// Records that `rule` needs `id`.
    pub fn require(&mut self, id: impl Into<String>, rule: RuleId) {
        self.requires.insert(id.into(), rule);
    }

    /// Records that `rule` provides `id`.
    pub fn satisfy(&mut self, id: impl Into<String>, rule: RuleId) {
        self.satisfies.insert(id.into(), rule);
    }

    /// Returns the `requires` map.
    #[must_use]
    pub fn requires(&self) -> &BTreeMap<String, RuleId> {
        &self.requires
    }

    /// Returns the `satisfies` map.
    #[must_use]
    pub fn satisfies(&self) -> &BTreeMap<String, RuleId> {
        &self.satisfies
    }

    /// Returns required ids nobody satisfies, with the rule that required them.
    #[must_use]
    pub fn unmet(&self) -> Vec<(&str, RuleId)> {
        self.requires
            .iter()
            .filter(|(id, _)| !self.satisfies.contains_key(*id))
            .map(|(id, rule)| (id.as_str(), *rule))
            .collect()
    }
}

/// Tags matched by each rule during fitting.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Provenance {
    matches: BTreeMap<RuleId, Vec<NodeId>>,
}

impl Provenance {
    /// Records that `rule` matched `node`.
    pub fn record(&mut self, rule: RuleId, node: NodeId) {
        let nodes = self.matches.entry(rule).or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    /// Returns the nodes matched by a rule.
    #[must_use]
    pub fn nodes(&self, rule: RuleId) -> &[NodeId] {
        self.matches.get(&rule).map_or(&[], Vec::as_slice)
    }

    /// Iterates over `(rule, nodes)` pairs in rule order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &[NodeId])> {
        self.matches.iter().map(|(rule, nodes)| (*rule, nodes.as_slice()))
    }

    /// Returns the number of rules that matched at least one node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Everything one conversion reads and writes besides the rules.
#[derive(Debug, Default)]
pub struct ConversionContext {
    /// The document being converted.
    pub document: Document,
    /// CSS collected from link/style tags and inline styles.
    pub styles: StyleMap,
    /// Findings.
    pub diagnostics: Diagnostics,
    /// `requires` / `satisfies` assertions.
    pub ledger: DependencyLedger,
    /// Rule → matched nodes.
    pub provenance: Provenance,
}

impl ConversionContext {
    /// Creates a context around a document.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    /// Records a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
