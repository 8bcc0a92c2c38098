//! Mutable HTML document tree for ampfit.
//!
//! Provides an arena-backed [`Document`] with stable [`NodeId`] handles, a
//! parser built on `html5ever`, and a serializer that writes the tree back to
//! markup. The converter mutates the tree in place; handles stay valid across
//! detach and re-append.

mod parse;
mod serialize;
mod tree;

pub use parse::parse_html;
pub use serialize::{inner_html, serialize};
pub use tree::{is_void_name, Attribute, Document, Element, NodeId, NodeKind};
