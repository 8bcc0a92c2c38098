//! Top-down rewrite of the parsed tree before structural fitting.

use crate::context::ConversionContext;
use crate::converter::ConvertError;
use crate::fetch::{resolve_resource_url, Fetcher, ImageStats};
use crate::repair::Repairer;
use crate::rewrite::{find_rewrite, is_rewrite_target, RewriteBox, RewriteContext};
use crate::stylesheet::inline_style_class;
use ampfit_dom::{inner_html, Attribute, NodeId};
use std::fmt::Write;
use tracing::debug;
use url::Url;

/// External inputs of the transformer.
#[derive(Clone, Copy)]
pub struct Resources<'a> {
    /// Source of linked stylesheets.
    pub fetcher: &'a dyn Fetcher,
    /// Source of image metadata.
    pub image_stats: &'a dyn ImageStats,
    /// Registered tag rewrites.
    pub rewrites: &'a [RewriteBox],
    /// Canonical URL relative references resolve against.
    pub base: &'a Url,
}

/// Rewrites a document so that every remaining tag has a rule.
pub struct Transformer<'a> {
    repairer: Repairer<'a>,
    resources: Resources<'a>,
    debug: bool,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer.
    #[must_use]
    pub fn new(repairer: Repairer<'a>, resources: Resources<'a>, debug: bool) -> Self {
        Self {
            repairer,
            resources,
            debug,
        }
    }

    /// Transforms `node` and its subtree.
    ///
    /// Returns the node that should take `node`'s place. It is `node` itself
    /// unless the element was replaced or removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a linked stylesheet or an image cannot be read.
    pub fn transform(&self, ctx: &mut ConversionContext, node: NodeId) -> Result<NodeId, ConvertError> {
        if ctx.document.is_document(node) {
            self.transform_children(ctx, node)?;
            return Ok(node);
        }
        let Some(name) = ctx.document.name(node).map(str::to_lowercase) else {
            return Ok(node);
        };

        if name == "link" && ctx.document.attr(node, "rel") == Some("stylesheet") {
            return self.extract_link(ctx, node);
        }
        if name == "style" {
            return Ok(self.extract_style(ctx, node));
        }

        let mut node = node;
        let mut name = name;
        let mut processed = false;

        let rewrites = self.resources.rewrites;
        if let Some(rewrite) = find_rewrite(rewrites, &name) {
            let mut cx = RewriteContext {
                document: &mut ctx.document,
                image_stats: self.resources.image_stats,
                base: self.resources.base,
            };
            node = rewrite.rewrite(&mut cx, node)?;
            name = rewrite.target_tag().to_string();
            processed = true;
        }

        let store = self.repairer.matcher().store();
        if name.contains('-')
            && !is_rewrite_target(rewrites, &name)
            && store.count_tag_rules(&name) == 0
        {
            node = self.unwrap_custom_element(ctx, node, &name);
            name = "div".to_string();
            processed = true;
        }

        if !processed && store.count_tag_rules(&name) == 0 {
            debug!("Removing <{name}>: no rule allows it");
            return Ok(self.removal(ctx, &format!(" removed: {name} tag ")));
        }

        self.move_inline_style(ctx, node, &name);

        let matched: Vec<_> = self
            .repairer
            .matcher()
            .rules_matched_by_tag(&ctx.document, node)
            .into_iter()
            .filter_map(|id| store.rule(id))
            .collect();
        for rule in &matched {
            self.repairer.repair_tag(ctx, node, rule);
        }
        if !matched.is_empty() {
            self.repairer.strip_undescribed(ctx, node, &matched);
        }

        self.transform_children(ctx, node)?;
        Ok(node)
    }

    fn transform_children(&self, ctx: &mut ConversionContext, node: NodeId) -> Result<(), ConvertError> {
        let children: Vec<NodeId> = ctx
            .document
            .children(node)
            .iter()
            .copied()
            .filter(|c| ctx.document.is_element(*c))
            .collect();
        for child in children {
            let replacement = self.transform(ctx, child)?;
            ctx.document.replace_child(child, replacement);
        }
        Ok(())
    }

    fn extract_link(&self, ctx: &mut ConversionContext, node: NodeId) -> Result<NodeId, ConvertError> {
        let Some(href) = ctx.document.attr(node, "href").map(str::to_string) else {
            return Ok(self.removal(ctx, "replaced: link tag. href attr is not found"));
        };

        let url = resolve_resource_url(self.resources.base, &href).map_err(|source| {
            ConvertError::InvalidResourceUrl {
                reference: href.clone(),
                source,
            }
        })?;
        debug!("Fetching stylesheet {url}");
        let body = self.resources.fetcher.fetch(&url)?;

        let mut css = String::new();
        if self.debug {
            let _ = writeln!(css, "/* from {href} */");
        }
        css.push_str(&String::from_utf8_lossy(&body));
        ctx.styles.push_fragment(css);

        Ok(self.removal(ctx, &format!(" replaced: link tag {href} ")))
    }

    fn extract_style(&self, ctx: &mut ConversionContext, node: NodeId) -> NodeId {
        let mut css = String::new();
        if self.debug {
            css.push_str("/* from style tag */\n");
        }
        css.push_str(&inner_html(&ctx.document, node));
        ctx.styles.push_fragment(css);
        self.removal(ctx, " replaced: style tag ")
    }

    fn unwrap_custom_element(&self, ctx: &mut ConversionContext, node: NodeId, name: &str) -> NodeId {
        let doc = &mut ctx.document;
        let div = doc.create_element("div");

        let mut class = String::new();
        let mut attrs: Vec<Attribute> = Vec::new();
        for attr in doc.take_attrs(node) {
            if attr.name == "class" {
                class = attr.value;
            } else {
                attrs.push(attr);
            }
        }
        if !class.is_empty() {
            class.push(' ');
        }
        class.push_str(name);
        attrs.push(Attribute::new("class", class));
        doc.set_attrs(div, attrs);

        for child in doc.take_children(node) {
            doc.append_child(div, child);
        }
        debug!("Replaced custom element <{name}> with <div>");
        div
    }

    fn move_inline_style(&self, ctx: &mut ConversionContext, node: NodeId, name: &str) {
        let doc = &mut ctx.document;
        let style = doc.remove_attr(node, "style").unwrap_or_default();
        let mut class = doc.remove_attr(node, "class").unwrap_or_default();

        if !style.is_empty() {
            let generated = inline_style_class(name, &style);
            ctx.styles.insert_rule(name, generated.as_str(), style);
            if !class.is_empty() {
                class.push(' ');
            }
            class.push_str(&generated);
        }
        if !class.is_empty() {
            ctx.document.set_attr(node, "class", class);
        }
    }

    fn removal(&self, ctx: &mut ConversionContext, note: &str) -> NodeId {
        if self.debug {
            ctx.document.create_comment(note)
        } else {
            ctx.document.create_text("")
        }
    }
}
