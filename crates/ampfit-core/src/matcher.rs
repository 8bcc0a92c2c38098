//! Pure predicates deciding whether document tags satisfy rules.

use crate::config::BlacklistPolarity;
use crate::properties::PropertyList;
use crate::rules::model::{AttributeRule, ParentConstraint, RuleId, TagRule, ValueConstraint};
use crate::store::RuleStore;
use ampfit_dom::{Document, NodeId};

/// Evaluates rules from a [`RuleStore`] against a document.
///
/// Every method is side-effect free.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    store: &'a RuleStore,
    polarity: BlacklistPolarity,
}

impl<'a> Matcher<'a> {
    /// Creates a matcher.
    #[must_use]
    pub fn new(store: &'a RuleStore, polarity: BlacklistPolarity) -> Self {
        Self { store, polarity }
    }

    /// Returns the rule store.
    #[must_use]
    pub fn store(&self) -> &'a RuleStore {
        self.store
    }

    /// Returns the blacklist polarity.
    #[must_use]
    pub fn polarity(&self) -> BlacklistPolarity {
        self.polarity
    }

    /// Tests an attribute value against the rule's value constraint and
    /// property list.
    #[must_use]
    pub fn value_satisfies(&self, rule: &AttributeRule, value: &str) -> bool {
        let value_ok = match rule.value() {
            ValueConstraint::None => true,
            ValueConstraint::Exact(expected) => value == expected,
            ValueConstraint::CaseInsensitive(expected) => {
                value.to_lowercase() == expected.to_lowercase()
            }
            ValueConstraint::Pattern(pattern) | ValueConstraint::PatternCaseInsensitive(pattern) => {
                pattern.is_match(value)
            }
            ValueConstraint::Blacklist(pattern) => self.polarity.accepts(pattern.is_match(value)),
        };
        value_ok && rule.properties().map_or(true, |props| {
            let found = PropertyList::parse(value);
            props.iter().all(|prop| match found.get(prop.name()) {
                Some(v) => prop.value().map_or(true, |expected| expected.accepts(v)),
                None => !prop.mandatory(),
            })
        })
    }

    /// Returns true if `node` satisfies `rule`.
    #[must_use]
    pub fn tag_satisfies_rule(&self, doc: &Document, node: NodeId, rule: &TagRule) -> bool {
        if !rule.applies_to(self.store.format()) || rule.is_doctype() {
            return false;
        }
        let Some(name) = doc.name(node) else {
            return false;
        };
        if !rule.names_tag(name) {
            return false;
        }
        if let Some(constraint) = rule.mandatory_parent() {
            if !parent_satisfies(doc, node, constraint) {
                return false;
            }
        }

        self.store.attribute_rules_for(rule).iter().all(|attr_rule| {
            match doc.attr(node, attr_rule.name()) {
                Some(value) => self.value_satisfies(attr_rule, value),
                None => {
                    !attr_rule.mandatory()
                        || attr_rule
                            .alternative_names()
                            .iter()
                            .any(|alias| doc.has_attr(node, alias))
                }
            }
        })
    }

    /// Returns the descendants of `root` matched by `rule`, in document order.
    ///
    /// When the rule has no mandatory attribute, a tag is only kept if every
    /// attribute on it is described by one of the rule's attribute rules.
    /// Without that, permissive rules such as a generic `<meta>` would claim
    /// every tag of their name.
    #[must_use]
    pub fn tags_matching_rule(&self, doc: &Document, rule: &TagRule, root: NodeId) -> Vec<NodeId> {
        let attr_rules = self.store.attribute_rules_for(rule);
        let strict = !attr_rules.iter().any(|a| a.mandatory());

        doc.elements_by_name(root, rule.tag_name())
            .into_iter()
            .filter(|node| self.tag_satisfies_rule(doc, *node, rule))
            .filter(|node| {
                !strict
                    || doc.attrs(*node).iter().all(|attr| {
                        attr_rules.iter().any(|a| {
                            (a.name() == attr.name && self.value_satisfies(a, &attr.value))
                                || a.alternative_names().iter().any(|alias| *alias == attr.name)
                        })
                    })
            })
            .collect()
    }

    /// Returns every applicable rule `node` satisfies, in declaration order.
    #[must_use]
    pub fn rules_matched_by_tag(&self, doc: &Document, node: NodeId) -> Vec<RuleId> {
        let Some(name) = doc.name(node) else {
            return Vec::new();
        };
        self.store
            .rules_for_tag(name)
            .into_iter()
            .filter(|rule| self.tag_satisfies_rule(doc, node, rule))
            .map(TagRule::id)
            .collect()
    }

    /// Returns the first resolved attribute rule naming `attr` directly or by alias.
    #[must_use]
    pub fn attribute_rule_named(&self, rule: &'a TagRule, attr: &str) -> Option<&'a AttributeRule> {
        self.store
            .attribute_rules_for(rule)
            .into_iter()
            .find(|a| a.accepts_name(attr))
    }
}

fn parent_satisfies(doc: &Document, node: NodeId, constraint: &ParentConstraint) -> bool {
    let Some(parent) = doc.parent(node) else {
        return false;
    };
    match constraint {
        ParentConstraint::DocumentRoot | ParentConstraint::Doctype => doc.is_document(parent),
        ParentConstraint::Tag(name) => doc.name(parent).is_some_and(|p| p.eq_ignore_ascii_case(name)),
    }
}
