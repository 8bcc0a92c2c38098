//! Arena-backed mutable document tree.
//!
//! Every node lives in a single vector owned by [`Document`] and is addressed
//! by a [`NodeId`]. Parent/child links are indices, so the tree can be
//! rewritten in place without fighting the borrow checker. Detached nodes stay
//! in the arena; they are simply unreachable from the root.

use serde::{Deserialize, Serialize};

/// Elements that never have children and are serialized without a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Opaque handle to a node inside a [`Document`].
///
/// Handles are only meaningful for the document that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// The document root is always the first node in the arena.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns the arena index of this node.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as written in the source.
    pub name: String,
    /// Attribute value (empty for bare attributes such as `async`).
    pub value: String,
}

impl Attribute {
    /// Creates a new attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Element payload: a tag name plus its ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<Attribute>,
}

impl Element {
    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attributes in document order.
    #[must_use]
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Returns the value of the named attribute, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns true if the named attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// `<!DOCTYPE name>`.
    Doctype(String),
    /// An element with attributes and children.
    Element(Element),
    /// Character data.
    Text(String),
    /// `<!-- ... -->`.
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document holding only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Returns the document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element(Element {
            name: name.into(),
            attrs: Vec::new(),
        }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Creates a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    /// Creates a detached doctype node.
    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Doctype(name.into()))
    }

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Returns the element payload, if the node is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Returns the tag name of an element node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    /// Returns true for the document root.
    #[must_use]
    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Document)
    }

    /// Returns true for element nodes.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Returns the doctype name if the node is a doctype.
    #[must_use]
    pub fn doctype_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Doctype(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the character data of a text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true if the node is an element that cannot have children.
    #[must_use]
    pub fn is_void_element(&self, id: NodeId) -> bool {
        self.name(id).is_some_and(is_void_name)
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Returns the children of a node in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Inserts `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.insert(0, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Puts `new` in the position currently held by `old`.
    ///
    /// `old` ends up detached. Does nothing if `old` has no parent.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        let Some(parent) = self.nodes[old.0].parent else {
            return;
        };
        self.detach(new);
        if let Some(slot) = self.nodes[parent.0]
            .children
            .iter_mut()
            .find(|c| **c == old)
        {
            *slot = new;
        }
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
    }

    /// Removes a node from its parent's child list.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Detaches and returns every child of `id`.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    /// Returns every descendant of `id` in document order (pre-order),
    /// excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Returns descendant elements of `id` whose name matches, ignoring ASCII case.
    #[must_use]
    pub fn elements_by_name(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.name(*n).is_some_and(|own| own.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// Returns the first descendant element of `id` with the given name.
    #[must_use]
    pub fn first_element_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.elements_by_name(id, name).into_iter().next()
    }

    /// Returns the nearest strict ancestor element with the given name.
    #[must_use]
    pub fn find_ancestor(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.name(node).is_some_and(|n| n.eq_ignore_ascii_case(name)) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Returns the attributes of an element (empty for other nodes).
    #[must_use]
    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], Element::attrs)
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Returns true if the element carries the attribute.
    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_attr(name))
    }

    /// Sets an attribute, replacing the value of an existing one in place.
    ///
    /// Ignored for non-element nodes.
    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|a| a.name == name) {
                Some(existing) => existing.value = value,
                None => el.attrs.push(Attribute { name, value }),
            }
        }
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        let index = el.attrs.iter().position(|a| a.name == name)?;
        Some(el.attrs.remove(index).value)
    }

    /// Replaces the whole attribute list.
    pub fn set_attrs(&mut self, id: NodeId, attrs: Vec<Attribute>) {
        if let Some(el) = self.element_mut(id) {
            el.attrs = attrs;
        }
    }

    /// Removes and returns the whole attribute list.
    pub fn take_attrs(&mut self, id: NodeId) -> Vec<Attribute> {
        self.element_mut(id)
            .map(|el| std::mem::take(&mut el.attrs))
            .unwrap_or_default()
    }
}

/// Returns true if the tag name is an HTML void element.
#[must_use]
pub fn is_void_name(name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), html);
        doc.append_child(html, body);
        doc.append_child(body, p);
        (doc, html, body, p)
    }

    #[test]
    fn append_sets_parent_and_order() {
        let (doc, html, body, p) = sample();
        assert_eq!(doc.parent(html), Some(NodeId::ROOT));
        assert_eq!(doc.children(body), &[p]);
        assert_eq!(doc.descendants(doc.root()), vec![html, body, p]);
    }

    #[test]
    fn append_moves_existing_child() {
        let (mut doc, html, body, p) = sample();
        doc.append_child(html, p);
        assert!(doc.children(body).is_empty());
        assert_eq!(doc.children(html), &[body, p]);
    }

    #[test]
    fn replace_child_keeps_position() {
        let (mut doc, html, body, _) = sample();
        let head = doc.create_element("head");
        let after = doc.create_element("footer");
        doc.append_child(html, after);
        doc.replace_child(body, head);
        assert_eq!(doc.children(html), &[head, after]);
        assert_eq!(doc.parent(body), None);
    }

    #[test]
    fn elements_by_name_ignores_case() {
        let (doc, _, body, _) = sample();
        assert_eq!(doc.elements_by_name(doc.root(), "BODY"), vec![body]);
    }

    #[test]
    fn find_ancestor_skips_self() {
        let (mut doc, html, _, p) = sample();
        let inner = doc.create_element("p");
        doc.append_child(p, inner);
        assert_eq!(doc.find_ancestor(inner, "p"), Some(p));
        assert_eq!(doc.find_ancestor(p, "p"), None);
        assert_eq!(doc.find_ancestor(p, "html"), Some(html));
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let (mut doc, _, _, p) = sample();
        doc.set_attr(p, "id", "a");
        doc.set_attr(p, "class", "b");
        doc.set_attr(p, "id", "c");
        assert_eq!(
            doc.attrs(p),
            &[Attribute::new("id", "c"), Attribute::new("class", "b")]
        );
        assert_eq!(doc.remove_attr(p, "id").as_deref(), Some("c"));
        assert!(!doc.has_attr(p, "id"));
    }

    #[test]
    fn take_children_detaches_all() {
        let (mut doc, html, body, _) = sample();
        let taken = doc.take_children(html);
        assert_eq!(taken, vec![body]);
        assert_eq!(doc.parent(body), None);
        assert!(doc.children(html).is_empty());
    }

    #[test]
    fn void_elements_are_recognised() {
        let mut doc = Document::new();
        let img = doc.create_element("IMG");
        let div = doc.create_element("div");
        assert!(doc.is_void_element(img));
        assert!(!doc.is_void_element(div));
    }
}
