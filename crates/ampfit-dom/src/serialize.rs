//! Serialization of a [`Document`] back to markup.

use crate::tree::{is_void_name, Document, NodeId, NodeKind};

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "xmp", "iframe", "noembed", "noframes"];

/// Serializes a node and its subtree.
#[must_use]
pub fn serialize(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serializes the children of a node without the node itself.
#[must_use]
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, &mut out);
    }
    out
}

impl Document {
    /// Serializes the whole document.
    #[must_use]
    pub fn to_html(&self) -> String {
        serialize(self, self.root())
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
        }
        NodeKind::Doctype(name) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Text(text) => {
            let raw = doc
                .parent(id)
                .and_then(|p| doc.name(p))
                .is_some_and(|name| RAW_TEXT_ELEMENTS.iter().any(|r| r.eq_ignore_ascii_case(name)));
            if raw {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(el.name());
            for attr in el.attrs() {
                out.push(' ');
                out.push_str(&attr.name);
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    escape_attr(&attr.value, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_name(el.name()) {
                return;
            }
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(el.name());
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_elements_attributes_and_text() {
        let mut doc = Document::new();
        let doctype = doc.create_doctype("html");
        let p = doc.create_element("p");
        let text = doc.create_text("a < b & c");
        doc.append_child(doc.root(), doctype);
        doc.append_child(doc.root(), p);
        doc.append_child(p, text);
        doc.set_attr(p, "title", "say \"hi\"");
        doc.set_attr(p, "hidden", "");
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><p title=\"say &quot;hi&quot;\" hidden>a &lt; b &amp; c</p>"
        );
    }

    #[test]
    fn void_elements_have_no_close_tag() {
        let mut doc = Document::new();
        let br = doc.create_element("br");
        doc.append_child(doc.root(), br);
        assert_eq!(doc.to_html(), "<br>");
    }

    #[test]
    fn style_content_is_raw() {
        let mut doc = Document::new();
        let style = doc.create_element("style");
        let css = doc.create_text("a > b{color:red}");
        doc.append_child(doc.root(), style);
        doc.append_child(style, css);
        assert_eq!(inner_html(&doc, style), "a > b{color:red}");
    }

    #[test]
    fn comments_round_trip() {
        let mut doc = Document::new();
        let comment = doc.create_comment(" removed: font tag ");
        doc.append_child(doc.root(), comment);
        assert_eq!(doc.to_html(), "<!-- removed: font tag -->");
    }
}
