//! Rewrite of `<img>` into `<amp-img>`.
//!
//! # Output
//!
//! - `src` is resolved against the canonical URL and replaced by the URL the
//!   image stats provider reports, followed by `width`, `height`, `layout`
//!   and, when the provider has one, `srcset`
//! - `alt` is copied as is
//! - a `src` that cannot be parsed as a URL is copied literally, without
//!   dimensions
//! - every other attribute is dropped
//!
//! ```text
//! <img src="a.png" alt="x" loading="lazy">
//! <amp-img src="https://example.com/a.png" alt="x" width="100" height="50" layout="responsive">
//! ```

use ampfit_core::{resolve_resource_url, FetchError, RewriteContext, TagRewrite};
use ampfit_dom::{Attribute, NodeId};
use tracing::debug;

/// Layout written when none is configured.
pub const DEFAULT_LAYOUT: &str = "responsive";

/// Rewrites `<img>` into `<amp-img>` with explicit dimensions.
#[derive(Debug, Clone)]
pub struct ImgToAmpImg {
    /// Value of the generated `layout` attribute.
    pub layout: String,
}

impl Default for ImgToAmpImg {
    fn default() -> Self {
        Self::new()
    }
}

impl ImgToAmpImg {
    /// Creates the rewrite with a responsive layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }

    /// Sets the layout written next to the dimensions.
    #[must_use]
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }
}

impl TagRewrite for ImgToAmpImg {
    fn source_tag(&self) -> &'static str {
        "img"
    }

    fn target_tag(&self) -> &'static str {
        "amp-img"
    }

    fn description(&self) -> &'static str {
        "Replaces <img> with <amp-img> carrying the image dimensions"
    }

    fn rewrite(&self, cx: &mut RewriteContext<'_>, node: NodeId) -> Result<NodeId, FetchError> {
        let mut attrs = Vec::new();
        let mut sizing = Vec::new();

        for attr in cx.document.attrs(node) {
            match attr.name.as_str() {
                "alt" => attrs.push(attr.clone()),
                "src" => {
                    let Ok(url) = resolve_resource_url(cx.base, &attr.value) else {
                        debug!("Keeping unparsable image src `{}`", attr.value);
                        attrs.push(attr.clone());
                        continue;
                    };
                    let size = cx.image_stats.image_size(&url)?;
                    let srcset = cx.image_stats.image_srcset(&size.url)?;

                    attrs.push(Attribute::new("src", size.url.as_str()));
                    sizing.push(Attribute::new("width", size.width.to_string()));
                    sizing.push(Attribute::new("height", size.height.to_string()));
                    sizing.push(Attribute::new("layout", self.layout.as_str()));
                    if !srcset.is_empty() {
                        sizing.push(Attribute::new("srcset", srcset));
                    }
                }
                _ => {}
            }
        }
        attrs.append(&mut sizing);

        let amp_img = cx.document.create_element("amp-img");
        cx.document.set_attrs(amp_img, attrs);
        Ok(amp_img)
    }
}
