//! HTML parsing into a [`Document`] via `html5ever`.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::tree::{Document, NodeId};

/// Parses an HTML string into a [`Document`].
///
/// Parsing never fails; malformed markup is recovered the way browsers do.
/// Scripting is treated as disabled so `<noscript>` content is parsed as
/// markup rather than raw text.
#[must_use]
pub fn parse_html(input: &str) -> Document {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom = parse_document(RcDom::default(), opts).one(input);

    let mut document = Document::new();
    let root = document.root();
    for child in dom.document.children.borrow().iter() {
        import(&mut document, root, child);
    }
    debug!(
        nodes = document.descendants(root).len(),
        "Parsed HTML document"
    );
    document
}

fn import(document: &mut Document, parent: NodeId, handle: &Handle) {
    let id = match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                import(document, parent, child);
            }
            return;
        }
        NodeData::Doctype { name, .. } => document.create_doctype(name.to_string()),
        NodeData::Text { contents } => document.create_text(contents.borrow().to_string()),
        NodeData::Comment { contents } => document.create_comment(contents.to_string()),
        NodeData::Element { name, attrs, .. } => {
            let element = document.create_element(name.local.to_string());
            for attr in attrs.borrow().iter() {
                document.set_attr(element, attr.name.local.to_string(), attr.value.to_string());
            }
            element
        }
        NodeData::ProcessingInstruction { .. } => return,
    };
    document.append_child(parent, id);
    for child in handle.children.borrow().iter() {
        import(document, id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_builds_full_skeleton() {
        let doc = parse_html("<p>hi</p>");
        let html = doc.first_element_by_name(doc.root(), "html");
        let body = doc.first_element_by_name(doc.root(), "body");
        assert!(html.is_some());
        assert!(doc.first_element_by_name(doc.root(), "head").is_some());
        let p = doc
            .first_element_by_name(doc.root(), "p")
            .map(|p| doc.parent(p));
        assert_eq!(p, Some(body));
    }

    #[test]
    fn parse_keeps_doctype_and_attributes() {
        let doc = parse_html("<!doctype html><html lang=en><body><img src=a.png alt=\"\"></body></html>");
        assert_eq!(doc.doctype_name(doc.children(doc.root())[0]), Some("html"));
        let img = doc.first_element_by_name(doc.root(), "img");
        let img = img.map(|id| doc.attrs(id).to_vec()).unwrap_or_default();
        assert_eq!(img.len(), 2);
        assert_eq!(img[0].name, "src");
        assert_eq!(img[0].value, "a.png");
    }

    #[test]
    fn noscript_content_is_markup() {
        let doc = parse_html("<head><noscript><style>a{}</style></noscript></head>");
        let style = doc.first_element_by_name(doc.root(), "style");
        let parent = style.and_then(|s| doc.parent(s)).and_then(|p| doc.name(p));
        assert_eq!(parent, Some("noscript"));
    }

    #[test]
    fn serialize_after_parse() {
        let doc = parse_html("<!DOCTYPE html><html><head></head><body><p class=x>a&amp;b</p></body></html>");
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><head></head><body><p class=\"x\">a&amp;b</p></body></html>"
        );
    }
}
