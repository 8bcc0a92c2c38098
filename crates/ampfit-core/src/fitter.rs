//! Structural fitting of a transformed document to the rule set.

use crate::context::ConversionContext;
use crate::repair::Repairer;
use crate::rules::model::TagRule;
use crate::synth::{Synthesizer, NOSCRIPT_BOILERPLATE_STYLE};
use crate::types::{Cause, Diagnostic, DiagnosticKind};
use ampfit_dom::NodeId;
use tracing::debug;

/// Walks the applicable rules in declaration order and fits the document
/// to each one.
#[derive(Debug, Clone, Copy)]
pub struct Fitter<'a> {
    repairer: Repairer<'a>,
    synthesizer: Synthesizer<'a>,
}

impl<'a> Fitter<'a> {
    /// Creates a fitter.
    #[must_use]
    pub fn new(repairer: Repairer<'a>, synthesizer: Synthesizer<'a>) -> Self {
        Self {
            repairer,
            synthesizer,
        }
    }

    /// Fits the document below `root` to every applicable rule.
    pub fn fit_all(&self, ctx: &mut ConversionContext, root: NodeId) {
        let store = self.repairer.matcher().store();
        for rule in store.applicable() {
            self.fit(ctx, rule, root);
        }
    }

    /// Fits the document below `root` to one rule.
    pub fn fit(&self, ctx: &mut ConversionContext, rule: &TagRule, root: NodeId) {
        let matcher = self.repairer.matcher();
        if !rule.applies_to(matcher.store().format()) {
            return;
        }
        debug!("Fitting {}", rule.display_name());

        if rule.requires_presence() {
            if rule.is_doctype() {
                ensure_doctype(ctx, root);
                return;
            }
            self.ensure_present(ctx, rule, root);
        }

        let matches = matcher.tags_matching_rule(&ctx.document, rule, root);
        if matches.len() > 1 {
            let kind = if rule.unique() {
                Some(DiagnosticKind::ValidatorError)
            } else if rule.unique_warning() {
                Some(DiagnosticKind::ValidatorWarning)
            } else {
                None
            };
            if let Some(kind) = kind {
                ctx.report(
                    Diagnostic::new(
                        kind,
                        Cause::Tag,
                        format!("expected one tag, found {}", matches.len()),
                    )
                    .at(root)
                    .from_rule(rule.id(), rule.display_name()),
                );
            }
        }

        for node in matches {
            self.check_match(ctx, rule, node);
        }
    }

    fn ensure_present(&self, ctx: &mut ConversionContext, rule: &TagRule, root: NodeId) {
        let matcher = self.repairer.matcher();
        if !matcher.tags_matching_rule(&ctx.document, rule, root).is_empty() {
            return;
        }

        if let Some(reusable) = self.synthesizer.find_reusable_tag(&ctx.document, rule, root) {
            debug!("Repairing existing tag for {}", rule.display_name());
            self.repairer.repair_tag(ctx, reusable, rule);
            self.repairer.strip_unknown(ctx, reusable, rule);
            if !matcher.tags_matching_rule(&ctx.document, rule, root).is_empty() {
                return;
            }
        }

        if rule.display_name() == NOSCRIPT_BOILERPLATE_STYLE {
            return;
        }
        if let Some(node) = self.synthesizer.insert(ctx, rule, root) {
            debug!("Inserted tag {node:?} for {}", rule.display_name());
        }
    }

    fn check_match(&self, ctx: &mut ConversionContext, rule: &TagRule, node: NodeId) {
        let report = |kind, cause, message: String| {
            Diagnostic::new(kind, cause, message)
                .at(node)
                .from_rule(rule.id(), rule.display_name())
        };

        for ancestor in rule.disallowed_ancestors() {
            if ctx.document.find_ancestor(node, ancestor).is_some() {
                ctx.report(report(
                    DiagnosticKind::ValidatorError,
                    Cause::DisallowedAncestor(ancestor.clone()),
                    format!("must not appear inside <{}>", ancestor.to_lowercase()),
                ));
            }
        }

        let attr_rules = self.repairer.matcher().store().attribute_rules_for(rule);
        for attr_rule in &attr_rules {
            let present = ctx.document.has_attr(node, attr_rule.name())
                || attr_rule
                    .alternative_names()
                    .iter()
                    .any(|alias| ctx.document.has_attr(node, alias));
            if attr_rule.mandatory() && !present {
                ctx.report(report(
                    DiagnosticKind::ValidatorError,
                    Cause::Attribute(attr_rule.name().to_string()),
                    format!("mandatory attribute `{}` is missing", attr_rule.name()),
                ));
            }
        }

        self.repairer.strip_unknown(ctx, node, rule);

        for id in rule.satisfies() {
            ctx.ledger.satisfy(id.as_str(), rule.id());
        }
        for id in rule.requires() {
            ctx.ledger.require(id.as_str(), rule.id());
        }

        if let Some(note) = rule.deprecation() {
            ctx.report(report(
                DiagnosticKind::DeprecationNotice,
                Cause::Tag,
                format!("tag is deprecated: {note}"),
            ));
        }

        ctx.provenance.record(rule.id(), node);
    }

    /// Reports every `requires` id no matched rule satisfies.
    pub fn verify_requirements(&self, ctx: &mut ConversionContext) {
        let store = self.repairer.matcher().store();
        let unmet: Vec<(String, _)> = ctx
            .ledger
            .unmet()
            .into_iter()
            .map(|(id, rule)| (id.to_string(), rule))
            .collect();
        for (id, rule_id) in unmet {
            let mut diagnostic = Diagnostic::new(
                DiagnosticKind::ValidatorError,
                Cause::Requirement(id.clone()),
                format!("requires `{id}`, which no tag provides"),
            );
            if let Some(rule) = store.rule(rule_id) {
                diagnostic = diagnostic.from_rule(rule_id, rule.display_name());
                if let Some(node) = ctx.provenance.nodes(rule_id).first() {
                    diagnostic = diagnostic.at(*node);
                }
            }
            ctx.report(diagnostic);
        }
    }
}

/// Makes the root's first child `<!DOCTYPE html>`.
fn ensure_doctype(ctx: &mut ConversionContext, root: NodeId) {
    let doc = &mut ctx.document;
    match doc.first_child(root) {
        Some(first) if doc.doctype_name(first).is_some() => {
            if doc.doctype_name(first) != Some("html") {
                let doctype = doc.create_doctype("html");
                doc.replace_child(first, doctype);
            }
        }
        _ => {
            let doctype = doc.create_doctype("html");
            doc.prepend_child(root, doctype);
        }
    }
}
