//! Indexed, format-filtered view over a [`RuleSet`].

use crate::rules::model::{AttributeRule, HtmlFormat, RuleId, RuleSet, TagRule, GLOBAL_ATTRS};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only rule lookup for one target format.
///
/// The underlying rule set is shared, so cloning a store is cheap and a single
/// set can back stores for several formats.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Arc<RuleSet>,
    format: HtmlFormat,
    by_name: HashMap<String, Vec<RuleId>>,
}

impl RuleStore {
    /// Builds the name index for `format`.
    #[must_use]
    pub fn new(rules: Arc<RuleSet>, format: HtmlFormat) -> Self {
        let mut by_name: HashMap<String, Vec<RuleId>> = HashMap::new();
        for tag in rules.tags().iter().filter(|t| t.applies_to(format)) {
            by_name
                .entry(tag.tag_name().to_ascii_lowercase())
                .or_default()
                .push(tag.id());
        }
        Self {
            rules,
            format,
            by_name,
        }
    }

    /// Returns the underlying rule set.
    #[must_use]
    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the active target format.
    #[must_use]
    pub fn format(&self) -> HtmlFormat {
        self.format
    }

    /// Returns a rule by id.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&TagRule> {
        self.rules.tag(id)
    }

    /// Iterates over the rules admitted by the active format, in declaration order.
    pub fn applicable(&self) -> impl Iterator<Item = &TagRule> {
        self.rules
            .tags()
            .iter()
            .filter(move |t| t.applies_to(self.format))
    }

    /// Returns the applicable rules for a tag name (ASCII case-insensitive).
    #[must_use]
    pub fn rules_for_tag(&self, name: &str) -> Vec<&TagRule> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|ids| ids.iter().filter_map(|id| self.rules.tag(*id)).collect())
            .unwrap_or_default()
    }

    /// Counts applicable rules for a tag name.
    #[must_use]
    pub fn count_tag_rules(&self, name: &str) -> usize {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map_or(0, Vec::len)
    }

    /// Finds the first rule with the given spec name.
    #[must_use]
    pub fn find_by_spec_name(&self, spec_name: &str) -> Option<&TagRule> {
        self.rules
            .tags()
            .iter()
            .find(|t| t.spec_name() == Some(spec_name))
    }

    /// Resolves the attribute rules of a tag rule.
    ///
    /// Order: inline rules, then referenced groups in reference order, then
    /// the global group. Duplicates are kept.
    #[must_use]
    pub fn attribute_rules_for<'a>(&'a self, rule: &'a TagRule) -> Vec<&'a AttributeRule> {
        let mut resolved: Vec<&AttributeRule> = rule.attrs().iter().collect();
        for name in rule.attr_lists() {
            if let Some(group) = self.rules.group(name) {
                resolved.extend(group.attrs());
            }
        }
        if let Some(global) = self.rules.group(GLOBAL_ATTRS) {
            resolved.extend(global.attrs());
        }
        resolved
    }
}
