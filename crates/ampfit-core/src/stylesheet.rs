//! Collection of CSS into the single `<style amp-custom>` element.

use crate::converter::ConvertError;
use crate::types::{Cause, Diagnostic, DiagnosticKind, Diagnostics};
use ampfit_dom::{Document, NodeId};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, warn};

/// Prefix of classes generated for inline styles.
pub const INLINE_CLASS_PREFIX: &str = "af";

/// Number of hex characters of the style digest kept in a class name.
const HASH_LEN: usize = 10;

/// CSS gathered during a conversion.
///
/// Fragments come from `<link rel=stylesheet>` and `<style>` tags and are
/// emitted verbatim in arrival order. Rules come from inline `style`
/// attributes and are emitted sorted by tag, then class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    fragments: Vec<String>,
    rules: BTreeMap<String, BTreeMap<String, String>>,
}

impl StyleMap {
    /// Appends a verbatim CSS fragment.
    pub fn push_fragment(&mut self, css: impl Into<String>) {
        self.fragments.push(css.into());
    }

    /// Records `selector{css}` for `tag.class`. An empty tag yields `.class`.
    pub fn insert_rule(&mut self, tag: &str, class: impl Into<String>, css: impl Into<String>) {
        self.rules
            .entry(tag.to_string())
            .or_default()
            .insert(class.into(), css.into());
    }

    /// Returns the verbatim fragments.
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Returns the CSS recorded for `tag.class`.
    #[must_use]
    pub fn rule(&self, tag: &str, class: &str) -> Option<&str> {
        self.rules.get(tag)?.get(class).map(String::as_str)
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.rules.is_empty()
    }

    /// Renders the stylesheet text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            out.push_str(fragment);
            out.push('\n');
        }
        for (tag, classes) in &self.rules {
            for (class, css) in classes {
                let _ = writeln!(out, "{tag}.{class}{{{css}}}");
            }
        }
        out
    }
}

/// Returns the class name an inline style on `tag` is moved to.
///
/// The name is derived from a SHA-256 digest of the style text, so the same
/// style on the same tag always gets the same class.
#[must_use]
pub fn inline_style_class(tag: &str, style: &str) -> String {
    let digest = Sha256::digest(style.as_bytes());
    let mut hex = String::with_capacity(HASH_LEN);
    for byte in digest.iter().take(HASH_LEN.div_ceil(2)) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex.truncate(HASH_LEN);
    format!("{INLINE_CLASS_PREFIX}-{tag}-{hex}")
}

// ────────────────────────────────────────────
// Minification
// ────────────────────────────────────────────

/// Shrinks CSS text that exceeds the style budget.
pub trait CssMinifier: Send + Sync {
    /// Returns the minified text.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Minify`] if the CSS cannot be processed.
    fn minify(&self, css: &str) -> Result<String, ConvertError>;
}

/// Minifier backed by the `minifier` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMinifier;

impl CssMinifier for DefaultMinifier {
    fn minify(&self, css: &str) -> Result<String, ConvertError> {
        minifier::css::minify(css)
            .map(|minified| minified.to_string())
            .map_err(|message| ConvertError::Minify {
                message: message.to_string(),
            })
    }
}

/// Renders `styles` and appends it to `head` as `<style amp-custom>`.
///
/// Text over `budget` bytes is minified. If it is still over budget a
/// [`DiagnosticKind::ValidatorWarning`] is recorded; the element is kept.
///
/// # Errors
///
/// Returns an error if the minifier fails.
pub fn inject_stylesheet(
    document: &mut Document,
    head: NodeId,
    styles: &StyleMap,
    budget: usize,
    minifier: &dyn CssMinifier,
    diagnostics: &mut Diagnostics,
) -> Result<NodeId, ConvertError> {
    let mut css = styles.render();
    if css.len() > budget {
        let before = css.len();
        css = minifier.minify(&css)?;
        debug!("Minified custom stylesheet from {before} to {} bytes", css.len());
    }

    let style = document.create_element("style");
    document.set_attr(style, "amp-custom", "");
    if !css.is_empty() {
        let text = document.create_text(css.as_str());
        document.append_child(style, text);
    }
    document.append_child(head, style);

    if css.len() > budget {
        warn!("Custom stylesheet is {} bytes, over the {budget} byte budget", css.len());
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::ValidatorWarning,
                Cause::StylesheetBudget {
                    size: css.len(),
                    budget,
                },
                format!("custom stylesheet exceeds {budget} bytes after minification"),
            )
            .at(style),
        );
    }
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMinifier {
        calls: AtomicUsize,
        output: &'static str,
    }

    impl CountingMinifier {
        fn new(output: &'static str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output,
            }
        }
    }

    impl CssMinifier for CountingMinifier {
        fn minify(&self, _css: &str) -> Result<String, ConvertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.to_string())
        }
    }

    fn head_document() -> (Document, NodeId) {
        let mut doc = Document::new();
        let head = doc.create_element("head");
        doc.append_child(doc.root(), head);
        (doc, head)
    }

    #[test]
    fn render_puts_fragments_before_sorted_rules() {
        let mut styles = StyleMap::default();
        styles.insert_rule("p", "af-p-2", "color:blue");
        styles.insert_rule("", "note", "margin:0");
        styles.push_fragment("a{color:red}");
        styles.insert_rule("div", "af-div-1", "color:green");
        styles.push_fragment("b{font-weight:bold}");

        insta::assert_snapshot!(styles.render(), @r"
        a{color:red}
        b{font-weight:bold}
        .note{margin:0}
        div.af-div-1{color:green}
        p.af-p-2{color:blue}
        ");
    }

    #[test]
    fn inline_style_class_is_stable() {
        let a = inline_style_class("p", "color:red");
        assert_eq!(a, inline_style_class("p", "color:red"));
        assert_ne!(a, inline_style_class("p", "color:blue"));
        assert_ne!(a, inline_style_class("div", "color:red"));

        let hash = a.strip_prefix("af-p-").unwrap();
        assert_eq!(hash.len(), 10);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stylesheet_is_injected_even_when_empty() {
        let (mut doc, head) = head_document();
        let mut diagnostics = Diagnostics::default();
        let minifier = CountingMinifier::new("");
        inject_stylesheet(&mut doc, head, &StyleMap::default(), 100, &minifier, &mut diagnostics)
            .unwrap();
        assert_eq!(doc.to_html(), "<head><style amp-custom></style></head>");
        assert_eq!(minifier.calls.load(Ordering::SeqCst), 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn minifier_runs_only_above_budget() {
        let mut styles = StyleMap::default();
        styles.push_fragment("p { color : red }");

        let (mut doc, head) = head_document();
        let mut diagnostics = Diagnostics::default();
        let minifier = CountingMinifier::new("p{color:red}");
        inject_stylesheet(&mut doc, head, &styles, 1_000, &minifier, &mut diagnostics).unwrap();
        assert_eq!(minifier.calls.load(Ordering::SeqCst), 0);

        let (mut doc, head) = head_document();
        inject_stylesheet(&mut doc, head, &styles, 15, &minifier, &mut diagnostics).unwrap();
        assert_eq!(minifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(doc.to_html(), "<head><style amp-custom>p{color:red}</style></head>");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn over_budget_after_minification_warns() {
        let mut styles = StyleMap::default();
        styles.push_fragment("p{color:red}");

        let (mut doc, head) = head_document();
        let mut diagnostics = Diagnostics::default();
        let minifier = CountingMinifier::new("p{color:red}");
        let style = inject_stylesheet(&mut doc, head, &styles, 5, &minifier, &mut diagnostics).unwrap();

        let warnings = diagnostics.of_kind(DiagnosticKind::ValidatorWarning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].node, Some(style));
        assert_eq!(
            warnings[0].cause,
            Cause::StylesheetBudget { size: 12, budget: 5 }
        );
        assert!(!diagnostics.has_fatal());
    }

    #[test]
    fn default_minifier_shrinks_css() {
        let out = DefaultMinifier
            .minify("p {\n  color : red ;\n}\n")
            .unwrap();
        assert!(out.len() < 20);
        assert!(out.contains("color:red"));
    }
}
