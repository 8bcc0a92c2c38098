//! Tag rewrite trait for replacing one element with an AMP equivalent.

use crate::fetch::{FetchError, ImageStats};
use ampfit_dom::{Document, NodeId};
use url::Url;

/// What a rewrite may touch while converting one element.
pub struct RewriteContext<'a> {
    /// The document being converted.
    pub document: &'a mut Document,
    /// Image metadata source.
    pub image_stats: &'a dyn ImageStats,
    /// Canonical URL relative references resolve against.
    pub base: &'a Url,
}

/// Replaces elements of one source tag with a typed AMP equivalent.
///
/// # Example
///
/// ```ignore
/// use ampfit_core::{RewriteContext, TagRewrite};
///
/// pub struct VideoToAmpVideo;
///
/// impl TagRewrite for VideoToAmpVideo {
///     fn source_tag(&self) -> &'static str { "video" }
///     fn target_tag(&self) -> &'static str { "amp-video" }
///
///     fn rewrite(&self, cx: &mut RewriteContext<'_>, node: NodeId) -> Result<NodeId, FetchError> {
///         let video = cx.document.create_element("amp-video");
///         // ...
///         Ok(video)
///     }
/// }
/// ```
pub trait TagRewrite: Send + Sync {
    /// Returns the lower-case tag name this rewrite consumes (e.g. "img").
    fn source_tag(&self) -> &'static str;

    /// Returns the tag name this rewrite produces (e.g. "amp-img").
    fn target_tag(&self) -> &'static str;

    /// Returns a brief description of the rewrite.
    fn description(&self) -> &'static str {
        ""
    }

    /// Builds the replacement for `node` and returns it detached.
    ///
    /// The caller puts the new node where `node` was.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource the replacement needs cannot be read.
    fn rewrite(&self, cx: &mut RewriteContext<'_>, node: NodeId) -> Result<NodeId, FetchError>;
}

/// Type alias for boxed rewrite trait objects.
pub type RewriteBox = Box<dyn TagRewrite>;

/// Looks up the rewrite registered for a tag name.
#[must_use]
pub fn find_rewrite<'r>(rewrites: &'r [RewriteBox], tag: &str) -> Option<&'r dyn TagRewrite> {
    rewrites
        .iter()
        .find(|r| r.source_tag().eq_ignore_ascii_case(tag))
        .map(|r| &**r)
}

/// Returns true if some rewrite produces `tag`.
#[must_use]
pub fn is_rewrite_target(rewrites: &[RewriteBox], tag: &str) -> bool {
    rewrites
        .iter()
        .any(|r| r.target_tag().eq_ignore_ascii_case(tag))
}
