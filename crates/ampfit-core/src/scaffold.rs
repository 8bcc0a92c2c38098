//! Guarantees the `<html>`, `<head>` and `<body>` skeleton.

use ampfit_dom::{Document, NodeId};
use tracing::debug;

/// Adds whatever part of the document skeleton is missing.
///
/// Without an `<html>` element the root is rebuilt as `<!DOCTYPE html>`
/// followed by `<html ⚡>`; the previous content goes directly under it when
/// it already has a `<body>`, and into a new `<body>` otherwise. A missing
/// `<head>` is prepended to `<html>` and a missing `<body>` appended.
///
/// Returns the `<head>` element.
pub fn ensure_skeleton(doc: &mut Document) -> NodeId {
    let root = doc.root();
    let html = match doc.first_element_by_name(root, "html") {
        Some(html) => html,
        None => wrap_in_html(doc, root),
    };

    let head = match doc.first_element_by_name(root, "head") {
        Some(head) => head,
        None => {
            debug!("Adding missing <head>");
            let head = doc.create_element("head");
            doc.prepend_child(html, head);
            head
        }
    };

    if doc.first_element_by_name(root, "body").is_none() {
        debug!("Adding missing <body>");
        let body = doc.create_element("body");
        doc.append_child(html, body);
    }
    head
}

fn wrap_in_html(doc: &mut Document, root: NodeId) -> NodeId {
    debug!("Adding missing <html>");
    let has_body = doc.first_element_by_name(root, "body").is_some();
    let content: Vec<NodeId> = doc
        .take_children(root)
        .into_iter()
        .filter(|child| doc.doctype_name(*child).is_none())
        .collect();

    let doctype = doc.create_doctype("html");
    let html = doc.create_element("html");
    doc.set_attr(html, "⚡", "");
    doc.append_child(root, doctype);
    doc.append_child(root, html);

    let container = if has_body {
        html
    } else {
        let body = doc.create_element("body");
        doc.append_child(html, body);
        body
    };
    for child in content {
        doc.append_child(container, child);
    }
    html
}
