//! In-place repair of attributes against their rules.

use crate::context::ConversionContext;
use crate::fetch::parse_lenient;
use crate::matcher::Matcher;
use crate::properties::PropertyList;
use crate::rules::model::{AttributeRule, PropertyRule, TagRule, UrlPolicy, ValueConstraint};
use crate::types::{Cause, Diagnostic, DiagnosticKind};
use ampfit_dom::NodeId;
use tracing::debug;

/// Applies attribute rules to live tags.
#[derive(Debug, Clone, Copy)]
pub struct Repairer<'a> {
    matcher: Matcher<'a>,
    enforce_allowed_protocols: bool,
}

impl<'a> Repairer<'a> {
    /// Creates a repairer.
    #[must_use]
    pub fn new(matcher: Matcher<'a>, enforce_allowed_protocols: bool) -> Self {
        Self {
            matcher,
            enforce_allowed_protocols,
        }
    }

    /// Returns the matcher.
    #[must_use]
    pub fn matcher(&self) -> Matcher<'a> {
        self.matcher
    }

    /// Repairs `node` against every resolved attribute rule of `rule`.
    pub fn repair_tag(&self, ctx: &mut ConversionContext, node: NodeId, rule: &TagRule) {
        for attr_rule in self.matcher.store().attribute_rules_for(rule) {
            self.repair_attribute(ctx, node, rule, attr_rule);
        }
    }

    /// Removes every attribute of `node` that no resolved rule names.
    ///
    /// Returns the removed attribute names.
    pub fn strip_unknown(&self, ctx: &mut ConversionContext, node: NodeId, rule: &TagRule) -> Vec<String> {
        self.strip_undescribed(ctx, node, &[rule])
    }

    /// Removes every attribute of `node` that none of `rules` names, directly
    /// or by alias.
    ///
    /// Removals are logged, not reported. Returns the removed attribute names.
    pub fn strip_undescribed(
        &self,
        ctx: &mut ConversionContext,
        node: NodeId,
        rules: &[&TagRule],
    ) -> Vec<String> {
        let store = self.matcher.store();
        let attr_rules: Vec<_> = rules
            .iter()
            .flat_map(|rule| store.attribute_rules_for(*rule))
            .collect();
        let unknown: Vec<String> = ctx
            .document
            .attrs(node)
            .iter()
            .filter(|attr| !attr_rules.iter().any(|r| r.accepts_name(&attr.name)))
            .map(|attr| attr.name.clone())
            .collect();
        for name in &unknown {
            debug!("<{}>: dropping unknown attribute `{name}`", ctx.document.name(node).unwrap_or_default());
            ctx.document.remove_attr(node, name);
        }
        unknown
    }

    /// Repairs one attribute of `node`.
    pub fn repair_attribute(
        &self,
        ctx: &mut ConversionContext,
        node: NodeId,
        rule: &TagRule,
        attr_rule: &AttributeRule,
    ) {
        let diagnostic = |kind, message: String| {
            Diagnostic::new(kind, Cause::Attribute(attr_rule.name().to_string()), message)
                .at(node)
                .from_rule(rule.id(), rule.display_name())
        };

        if attr_rule
            .alternative_names()
            .iter()
            .any(|alias| ctx.document.has_attr(node, alias))
        {
            return;
        }

        let name = attr_rule.name();
        if attr_rule.mandatory() && !ctx.document.has_attr(node, name) {
            if let Some(literal) = attr_rule.value().literal() {
                ctx.document.set_attr(node, name, literal);
            } else {
                ctx.report(diagnostic(
                    DiagnosticKind::ValidatorError,
                    format!("mandatory attribute `{name}` is missing"),
                ));
                return;
            }
        }

        let deprecation_notice = || {
            attr_rule.deprecation().map(|note| {
                diagnostic(
                    DiagnosticKind::DeprecationNotice,
                    format!("`{name}` is deprecated: {note}"),
                )
            })
        };

        let Some(value) = ctx.document.attr(node, name).map(str::to_string) else {
            if let Some(notice) = deprecation_notice() {
                ctx.report(notice);
            }
            return;
        };

        let violates = match attr_rule.value() {
            ValueConstraint::Pattern(pattern) | ValueConstraint::PatternCaseInsensitive(pattern) => {
                !pattern.is_match(&value)
            }
            ValueConstraint::Blacklist(pattern) => {
                !self.matcher.polarity().accepts(pattern.is_match(&value))
            }
            ValueConstraint::Exact(expected) if value != *expected => {
                ctx.report(diagnostic(
                    DiagnosticKind::ValidatorError,
                    format!("`{name}` must be \"{expected}\", found \"{value}\""),
                ));
                return;
            }
            ValueConstraint::CaseInsensitive(expected)
                if value.to_lowercase() != expected.to_lowercase() =>
            {
                ctx.report(diagnostic(
                    DiagnosticKind::ValidatorError,
                    format!("`{name}` must be \"{expected}\" (any case), found \"{value}\""),
                ));
                return;
            }
            _ => false,
        };
        if violates {
            ctx.document.remove_attr(node, name);
            ctx.report(diagnostic(
                DiagnosticKind::AttributeStripped,
                format!("removed `{name}`: value \"{value}\" is not allowed"),
            ));
        } else {
            if let Some(policy) = attr_rule.url() {
                for message in self.url_violations(policy, &value) {
                    ctx.report(diagnostic(DiagnosticKind::ValidatorError, message));
                }
            }

            if let Some(props) = attr_rule.properties() {
                if let Some(rewritten) = rewrite_properties(props, &value) {
                    debug!("{}: `{name}` rewritten to \"{rewritten}\"", rule.display_name());
                    ctx.document.set_attr(node, name, rewritten);
                }
            }
        }

        if let Some(notice) = deprecation_notice() {
            ctx.report(notice);
        }
    }

    fn url_violations(&self, policy: &UrlPolicy, value: &str) -> Vec<String> {
        if value.trim().is_empty() {
            return if policy.allow_empty {
                Vec::new()
            } else {
                vec!["URL must not be empty".to_string()]
            };
        }

        let (url, relative) = match parse_lenient(value) {
            Ok(parsed) => parsed,
            Err(e) => return vec![format!("invalid URL \"{value}\": {e}")],
        };

        let mut violations = Vec::new();
        if let Some(host) = url.host_str() {
            if policy.disallowed_domains.iter().any(|d| d == host) {
                violations.push(format!("host `{host}` is not allowed"));
            }
        }
        if self.enforce_allowed_protocols {
            if relative {
                if !policy.allow_relative {
                    violations.push(format!("relative URL \"{value}\" is not allowed"));
                }
            } else if !policy.allowed_protocols.is_empty()
                && !policy.allowed_protocols.iter().any(|p| p == url.scheme())
            {
                violations.push(format!("protocol `{}` is not allowed", url.scheme()));
            }
        }
        violations
    }
}

/// Pins literal-valued properties and appends missing mandatory ones.
///
/// Returns the new value only if something changed.
fn rewrite_properties(props: &[PropertyRule], value: &str) -> Option<String> {
    let mut list = PropertyList::parse(value);
    let mut changed = false;
    for prop in props {
        let Some(expected) = prop.value() else {
            continue;
        };
        match list.get(prop.name()) {
            Some(found) if !expected.accepts(found) => {
                list.set(prop.name(), expected.render());
                changed = true;
            }
            None if prop.mandatory() => {
                list.set(prop.name(), expected.render());
                changed = true;
            }
            _ => {}
        }
    }
    changed.then(|| list.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlacklistPolarity;
    use crate::rules::load_rules;
    use crate::rules::model::HtmlFormat;
    use crate::store::RuleStore;
    use ampfit_dom::parse_html;
    use std::sync::Arc;

    const RULES: &str = r#"
[[tags]]
tag-name = "HTML"
attrs = [{ name = "⚡", alternative-names = ["amp"], mandatory = true, value = "" }]

[[tags]]
tag-name = "META"
spec-name = "meta charset=utf-8"
attrs = [{ name = "charset", mandatory = true, value-casei = "utf-8" }]

[[tags]]
tag-name = "META"
spec-name = "meta name=viewport"

[[tags.attrs]]
name = "content"
mandatory = true
value-properties = [
    { name = "width", mandatory = true, value = "device-width" },
    { name = "minimum-scale", value-double = 1.0 },
    { name = "initial-scale" },
]

[[tags]]
tag-name = "A"
attrs = [
    { name = "target", value-regex = "^_(blank|self)$" },
    { name = "rel", blacklisted-value-regex = "^(nofollow|noopener)$" },
    { name = "href", value-url = { allowed-protocol = ["https"], disallowed-domain = ["evil.example"] } },
    { name = "name", deprecation = "use id" },
]

[[tags]]
tag-name = "SCRIPT"
attrs = [{ name = "src", mandatory = true, value-regex = "\\.js$" }]

[[tags]]
tag-name = "TABLE"
attrs = [{ name = "border", value-regex = "^(0|1)$", deprecation = "use CSS" }]
"#;

    struct Fixture {
        store: RuleStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: RuleStore::new(Arc::new(load_rules(RULES).unwrap()), HtmlFormat::Amp),
            }
        }

        fn rule(&self, name: &str) -> &TagRule {
            self.store
                .applicable()
                .find(|r| r.display_name() == name)
                .unwrap()
        }

        fn repair(&self, html: &str, tag: &str, rule: &str, enforce: bool) -> (ConversionContext, NodeId) {
            let mut ctx = ConversionContext::new(parse_html(html));
            let node = ctx
                .document
                .first_element_by_name(ctx.document.root(), tag)
                .unwrap();
            let repairer = Repairer::new(
                Matcher::new(&self.store, BlacklistPolarity::Inverted),
                enforce,
            );
            repairer.repair_tag(&mut ctx, node, self.rule(rule));
            (ctx, node)
        }
    }

    #[test]
    fn mandatory_literal_is_supplied() {
        let f = Fixture::new();
        let (ctx, html) = f.repair("<p>x</p>", "html", "HTML", false);
        assert_eq!(ctx.document.attr(html, "⚡"), Some(""));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn alias_skips_repair() {
        let f = Fixture::new();
        let (ctx, html) = f.repair("<html amp><p>x</p></html>", "html", "HTML", false);
        assert!(!ctx.document.has_attr(html, "⚡"));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn mandatory_without_literal_is_an_error() {
        let f = Fixture::new();
        let (ctx, script) = f.repair("<head><script></script></head>", "script", "SCRIPT", false);
        assert!(!ctx.document.has_attr(script, "src"));
        let errors = ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].cause, Cause::Attribute("src".into()));
        assert_eq!(errors[0].node, Some(script));
    }

    #[test]
    fn case_insensitive_mismatch_keeps_attribute() {
        let f = Fixture::new();
        let (ctx, meta) = f.repair(
            "<head><meta charset=latin1></head>",
            "meta",
            "meta charset=utf-8",
            false,
        );
        assert_eq!(ctx.document.attr(meta, "charset"), Some("latin1"));
        assert_eq!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).len(), 1);

        let (ctx, _) = f.repair(
            "<head><meta charset=UTF-8></head>",
            "meta",
            "meta charset=utf-8",
            false,
        );
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn regex_and_blacklist_violations_strip() {
        let f = Fixture::new();
        let (ctx, a) = f.repair(
            r#"<a target="_new" rel="external" href="https://example.com">x</a>"#,
            "a",
            "A",
            false,
        );
        assert!(!ctx.document.has_attr(a, "target"));
        assert!(!ctx.document.has_attr(a, "rel"));
        assert_eq!(
            ctx.diagnostics.of_kind(DiagnosticKind::AttributeStripped).len(),
            2
        );
        assert!(!ctx.diagnostics.has_fatal());
    }

    #[test]
    fn properties_are_rewritten_in_place() {
        let f = Fixture::new();
        let (ctx, meta) = f.repair(
            r#"<head><meta content="initial-scale=2,width=500,minimum-scale=3"></head>"#,
            "meta",
            "meta name=viewport",
            false,
        );
        assert_eq!(
            ctx.document.attr(meta, "content"),
            Some("initial-scale=2,width=device-width,minimum-scale=1")
        );
    }

    #[test]
    fn mandatory_property_is_appended() {
        let f = Fixture::new();
        let (ctx, meta) = f.repair(
            r#"<head><meta content="initial-scale=1"></head>"#,
            "meta",
            "meta name=viewport",
            false,
        );
        assert_eq!(
            ctx.document.attr(meta, "content"),
            Some("initial-scale=1,width=device-width")
        );
    }

    #[test]
    fn untouched_properties_keep_original_text() {
        let f = Fixture::new();
        let (ctx, meta) = f.repair(
            r#"<head><meta content="width = device-width"></head>"#,
            "meta",
            "meta name=viewport",
            false,
        );
        assert_eq!(ctx.document.attr(meta, "content"), Some("width = device-width"));
    }

    #[test]
    fn url_policy() {
        let f = Fixture::new();
        let (ctx, _) = f.repair(r#"<a href="">x</a>"#, "a", "A", false);
        assert_eq!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).len(), 1);

        let (ctx, _) = f.repair(r#"<a href="https://evil.example/x">x</a>"#, "a", "A", false);
        assert_eq!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).len(), 1);

        let (ctx, _) = f.repair(r#"<a href="/relative">x</a>"#, "a", "A", false);
        assert!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).is_empty());

        let (ctx, _) = f.repair(r#"<a href="http://[::1">x</a>"#, "a", "A", false);
        assert_eq!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).len(), 1);
    }

    #[test]
    fn protocol_enforcement_is_opt_in() {
        let f = Fixture::new();
        let (ctx, _) = f.repair(r#"<a href="ftp://example.com/x">x</a>"#, "a", "A", false);
        assert!(!ctx.diagnostics.has_fatal());

        let (ctx, _) = f.repair(r#"<a href="ftp://example.com/x">x</a>"#, "a", "A", true);
        assert_eq!(ctx.diagnostics.of_kind(DiagnosticKind::ValidatorError).len(), 1);
    }

    #[test]
    fn deprecated_attribute_is_always_noticed() {
        let f = Fixture::new();
        for html in [r#"<a name="top">x</a>"#, "<a>x</a>"] {
            let (ctx, _) = f.repair(html, "a", "A", false);
            let notices = ctx.diagnostics.of_kind(DiagnosticKind::DeprecationNotice);
            assert_eq!(notices.len(), 1, "{html}");
            assert_eq!(notices[0].cause, Cause::Attribute("name".into()));
        }
    }

    #[test]
    fn stripped_deprecated_attribute_is_still_noticed() {
        let f = Fixture::new();
        let (ctx, table) = f.repair(
            r#"<table border="2"><tr><td>x</td></tr></table>"#,
            "table",
            "TABLE",
            false,
        );
        assert!(!ctx.document.has_attr(table, "border"));
        assert_eq!(
            ctx.diagnostics.of_kind(DiagnosticKind::AttributeStripped).len(),
            1
        );
        assert_eq!(
            ctx.diagnostics.of_kind(DiagnosticKind::DeprecationNotice).len(),
            1
        );
    }

    #[test]
    fn strip_unknown_removes_unnamed_attributes() {
        let f = Fixture::new();
        let mut ctx = ConversionContext::new(parse_html(r#"<a name="x" onclick="go()">x</a>"#));
        let a = ctx
            .document
            .first_element_by_name(ctx.document.root(), "a")
            .unwrap();
        let repairer = Repairer::new(Matcher::new(&f.store, BlacklistPolarity::Inverted), false);
        let removed = repairer.strip_unknown(&mut ctx, a, f.rule("A"));
        assert_eq!(removed, ["onclick"]);
        assert!(ctx.document.has_attr(a, "name"));
    }
}
