//! Node type definitions.
//!
//! The `NodeKind` enum carries the payload of each node type a WBXML tree
//! can hold. Navigation links (parent, children, siblings) are stored in
//! `NodeData`, not here.

use super::{Attribute, Tree};
use crate::util::Buffer;

/// The kind of a tree node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An element node, e.g., `<Item id="1">`.
    Element {
        /// The element name as written, prefix included.
        name: String,
        /// Attributes on this element, in document order.
        attributes: Vec<Attribute>,
    },

    /// Character data.
    Text {
        /// The raw text bytes (references already expanded).
        content: Buffer,
    },

    /// A CDATA section. Its content is held by its Text children.
    CData,

    /// A complete document embedded at this position, built by a separate
    /// parse of the elided source fragment.
    Tree {
        /// The embedded document.
        tree: Box<Tree>,
    },
}
