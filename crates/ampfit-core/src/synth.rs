//! Creation and placement of tags that mandatory rules require.

use crate::context::ConversionContext;
use crate::rules::model::{ParentConstraint, TagRule};
use crate::store::RuleStore;
use crate::types::{Cause, Diagnostic, DiagnosticKind};
use ampfit_dom::{Document, NodeId};
use tracing::debug;

/// Spec name of the boilerplate `<style>` in `<head>`.
pub const HEAD_BOILERPLATE: &str = "head > style[amp-boilerplate]";

/// Spec name of the `<noscript>` wrapping the fallback boilerplate.
pub const NOSCRIPT_BOILERPLATE: &str = "noscript enclosure for boilerplate";

/// Spec name of the fallback boilerplate `<style>` itself. It is created
/// together with its `<noscript>`, never on its own.
pub const NOSCRIPT_BOILERPLATE_STYLE: &str = "noscript > style[amp-boilerplate]";

/// Spec name of the canonical link, whose `href` comes from configuration.
pub const CANONICAL_LINK: &str = "link rel=canonical";

/// CSS of `<style amp-boilerplate>` in `<head>`.
pub const HEAD_BOILERPLATE_CSS: &str = "body{-webkit-animation:-amp-start 8s steps(1,end) 0s 1 normal both;-moz-animation:-amp-start 8s steps(1,end) 0s 1 normal both;-ms-animation:-amp-start 8s steps(1,end) 0s 1 normal both;animation:-amp-start 8s steps(1,end) 0s 1 normal both}@-webkit-keyframes -amp-start{from{visibility:hidden}to{visibility:visible}}@-moz-keyframes -amp-start{from{visibility:hidden}to{visibility:visible}}@-ms-keyframes -amp-start{from{visibility:hidden}to{visibility:visible}}@-o-keyframes -amp-start{from{visibility:hidden}to{visibility:visible}}@keyframes -amp-start{from{visibility:hidden}to{visibility:visible}}";

/// CSS of `<style amp-boilerplate>` inside `<noscript>`.
pub const NOSCRIPT_BOILERPLATE_CSS: &str =
    "body{-webkit-animation:none;-moz-animation:none;-ms-animation:none;animation:none}";

/// Builds and places tags for rules that have no match.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    store: &'a RuleStore,
    canonical_url: &'a str,
    debug: bool,
}

impl<'a> Synthesizer<'a> {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(store: &'a RuleStore, canonical_url: &'a str, debug: bool) -> Self {
        Self {
            store,
            canonical_url,
            debug,
        }
    }

    /// Builds a detached node satisfying `rule`.
    ///
    /// Returns `None` after recording a [`DiagnosticKind::SynthesisError`]
    /// when a mandatory attribute has no value that can be derived.
    pub fn synthesize_node(&self, ctx: &mut ConversionContext, rule: &TagRule) -> Option<NodeId> {
        if rule.is_doctype() {
            return Some(ctx.document.create_doctype("html"));
        }
        let node = match rule.display_name() {
            HEAD_BOILERPLATE => boilerplate_style(&mut ctx.document, HEAD_BOILERPLATE_CSS),
            NOSCRIPT_BOILERPLATE => {
                let noscript = ctx.document.create_element("noscript");
                let style = boilerplate_style(&mut ctx.document, NOSCRIPT_BOILERPLATE_CSS);
                ctx.document.append_child(noscript, style);
                noscript
            }
            _ => self.element_with_mandatory_attrs(ctx, rule)?,
        };

        if self.debug && !rule.cdata() && !ctx.document.is_void_element(node) {
            let comment = ctx
                .document
                .create_comment(format!("from: {}", rule.display_name()));
            ctx.document.append_child(node, comment);
        }
        debug!(
            "Synthesized <{}> for {}",
            rule.tag_name().to_lowercase(),
            rule.display_name()
        );
        Some(node)
    }

    /// Builds a plain element carrying every mandatory attribute with a
    /// derivable value.
    fn element_with_mandatory_attrs(
        &self,
        ctx: &mut ConversionContext,
        rule: &TagRule,
    ) -> Option<NodeId> {
        let node = ctx.document.create_element(rule.tag_name().to_lowercase());
        let mut unresolved = Vec::new();
        for attr_rule in self.store.attribute_rules_for(rule) {
            if !attr_rule.mandatory() {
                continue;
            }
            if let Some(literal) = attr_rule.value().literal() {
                ctx.document.set_attr(node, attr_rule.name(), literal);
                continue;
            }
            let Some(props) = attr_rule.properties() else {
                unresolved.push(attr_rule.name());
                continue;
            };

            let mut rendered = Vec::new();
            for prop in props.iter().filter(|p| p.mandatory()) {
                let Some(value) = prop.value() else {
                    ctx.report(synthesis_error(
                        rule,
                        Cause::Property(prop.name().to_string()),
                        format!(
                            "mandatory property `{}` of `{}` has no value to use",
                            prop.name(),
                            attr_rule.name()
                        ),
                    ));
                    return None;
                };
                rendered.push(format!("{}={}", prop.name(), value.render()));
            }
            ctx.document.set_attr(node, attr_rule.name(), rendered.join(","));
        }

        if rule.display_name() == CANONICAL_LINK {
            ctx.document.set_attr(node, "href", self.canonical_url);
        }
        if let Some(missing) = unresolved
            .into_iter()
            .find(|name| !ctx.document.has_attr(node, name))
        {
            ctx.report(synthesis_error(
                rule,
                Cause::Attribute(missing.to_string()),
                format!("mandatory attribute `{missing}` has no value to use"),
            ));
            return None;
        }
        Some(node)
    }

    /// Returns the node a synthesized tag for `rule` is appended to.
    ///
    /// Records a [`DiagnosticKind::InsertionError`] and returns `None` when
    /// the required parent does not exist.
    pub fn resolve_insertion_point(
        &self,
        ctx: &mut ConversionContext,
        rule: &TagRule,
        root: NodeId,
    ) -> Option<NodeId> {
        let (parent, wanted) = match rule.mandatory_parent() {
            Some(ParentConstraint::DocumentRoot | ParentConstraint::Doctype) => return Some(root),
            Some(ParentConstraint::Tag(name)) => {
                (ctx.document.first_element_by_name(root, name), name.as_str())
            }
            None => (ctx.document.first_element_by_name(root, "body"), "BODY"),
        };
        if parent.is_none() {
            ctx.report(
                Diagnostic::new(
                    DiagnosticKind::InsertionError,
                    Cause::Tag,
                    format!("no <{}> to insert into", wanted.to_lowercase()),
                )
                .from_rule(rule.id(), rule.display_name()),
            );
        }
        parent
    }

    /// Synthesizes a tag for `rule` and appends it at its insertion point.
    ///
    /// Returns the inserted node.
    pub fn insert(&self, ctx: &mut ConversionContext, rule: &TagRule, root: NodeId) -> Option<NodeId> {
        let node = self.synthesize_node(ctx, rule)?;
        let parent = self.resolve_insertion_point(ctx, rule, root)?;
        ctx.document.append_child(parent, node);
        Some(node)
    }

    /// Returns an existing tag that may be repaired into a match for `rule`.
    ///
    /// Only rules that are mandatory, unique and the sole rule for their tag
    /// name qualify; the first tag of that name is returned.
    #[must_use]
    pub fn find_reusable_tag(&self, doc: &Document, rule: &TagRule, root: NodeId) -> Option<NodeId> {
        if !rule.mandatory() || !rule.unique() || self.store.count_tag_rules(rule.tag_name()) != 1 {
            return None;
        }
        doc.first_element_by_name(root, rule.tag_name())
    }
}

fn boilerplate_style(doc: &mut Document, css: &str) -> NodeId {
    let style = doc.create_element("style");
    doc.set_attr(style, "amp-boilerplate", "");
    let text = doc.create_text(css);
    doc.append_child(style, text);
    style
}

fn synthesis_error(rule: &TagRule, cause: Cause, message: String) -> Diagnostic {
    Diagnostic::new(DiagnosticKind::SynthesisError, cause, message)
        .from_rule(rule.id(), rule.display_name())
}
