//! Arena-based WBXML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Tree`], and
//! are referenced by [`NodeId`], a newtype over `NonZeroU32`. Parent, child
//! and sibling links are arena indices, so a cursor into the tree is just a
//! `NodeId` and can never dangle or form an ownership cycle.
//!
//! A tree carries, besides its nodes, the language table that decides how
//! it will be tokenized and the charset its source declared.
//!
//! Allocation goes through `try_reserve`; running out of memory is reported
//! as [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory)
//! instead of aborting.

mod node;
pub mod syncml;

pub use node::NodeKind;

use std::num::NonZeroU32;

use crate::encoding::Charset;
use crate::error::{ParseDiagnostic, ParseError};
use crate::lang::LanguageTable;
use crate::util::Buffer;

/// A typed index into the tree's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` for arena slot `index`.
    fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the arena slot this id refers to.
    fn as_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. Only the root has none.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name as written.
    pub name: String,
    /// The attribute value (references expanded).
    pub value: String,
}

/// A document tree ready for WBXML encoding.
///
/// # Examples
///
/// ```
/// use wbxml_tree::Tree;
///
/// let tree = Tree::from_xml(b"<si><indication>New mail</indication></si>").unwrap();
/// let root = tree.root().unwrap();
/// assert_eq!(tree.node_name(root), Some("si"));
/// assert_eq!(tree.text_content(root), "New mail");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tree {
    /// The node arena.
    nodes: Vec<NodeData>,
    /// The root element, once one has been added.
    root: Option<NodeId>,
    /// The language table resolved for this document.
    pub lang: Option<&'static LanguageTable>,
    /// The charset declared by the source document.
    pub charset: Charset,
    /// Warnings collected while the tree was built.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from raw XML bytes with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the document cannot be decoded, parsed, or
    /// matched to a language table.
    pub fn from_xml(input: &[u8]) -> Result<Self, ParseError> {
        crate::parser::parse_bytes(input)
    }

    /// Returns the root element, if one has been added.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the name of an element node.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns `true` if the node is a CDATA section.
    #[must_use]
    pub fn is_cdata(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::CData)
    }

    /// Returns the content of a Text node.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&Buffer> {
        match &self.node(id).kind {
            NodeKind::Text { content } => Some(content),
            _ => None,
        }
    }

    /// Returns the document held by an embedded-tree node.
    #[must_use]
    pub fn embedded(&self, id: NodeId) -> Option<&Tree> {
        match &self.node(id).kind {
            NodeKind::Tree { tree } => Some(tree),
            _ => None,
        }
    }

    /// Returns the concatenated text of a node and its descendants.
    ///
    /// Embedded documents are not descended into.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut bytes = Vec::new();
        self.collect_text(id, &mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn collect_text(&self, id: NodeId, buf: &mut Vec<u8>) {
        match &self.node(id).kind {
            NodeKind::Text { content } => buf.extend_from_slice(content.as_bytes()),
            NodeKind::Tree { .. } => {}
            NodeKind::Element { .. } | NodeKind::CData => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    /// Returns the attributes of an element node.
    ///
    /// Returns an empty slice for non-element nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by name on an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns the number of nodes in this tree, not counting the nodes of
    /// embedded documents.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // --- Construction ---

    /// Adds an element under `parent`, or as the root when `parent` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the arena cannot grow; `Internal` if `parent` is
    /// `None` but the tree already has a root.
    pub fn add_element(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        attributes: &[(String, String)],
    ) -> Result<NodeId, ParseError> {
        if parent.is_none() && self.root.is_some() {
            return Err(ParseError::internal(format!(
                "second root element <{name}>"
            )));
        }

        let mut attrs = Vec::new();
        attrs
            .try_reserve_exact(attributes.len())
            .map_err(|_| ParseError::out_of_memory("attributes"))?;
        attrs.extend(attributes.iter().map(|(name, value)| Attribute {
            name: name.clone(),
            value: value.clone(),
        }));

        let id = self.create_node(NodeKind::Element {
            name: name.to_string(),
            attributes: attrs,
        })?;
        match parent {
            Some(parent) => self.append_child(parent, id),
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Appends character data as the last child of `parent`.
    ///
    /// Text following a Text node is merged into it, so consecutive
    /// character chunks produce a single node. Returns the Text node that
    /// now holds the bytes.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the node or its buffer cannot be allocated.
    pub fn add_text(&mut self, parent: NodeId, bytes: &[u8]) -> Result<NodeId, ParseError> {
        if let Some(last) = self.last_child(parent) {
            if let NodeKind::Text { content } = &mut self.node_mut(last).kind {
                content
                    .append(bytes)
                    .map_err(|_| ParseError::out_of_memory("text"))?;
                return Ok(last);
            }
        }

        let content = Buffer::from_slice(bytes).map_err(|_| ParseError::out_of_memory("text"))?;
        let id = self.create_node(NodeKind::Text { content })?;
        self.append_child(parent, id);
        Ok(id)
    }

    /// Appends an empty CDATA section under `parent`.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the arena cannot grow.
    pub fn add_cdata(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let id = self.create_node(NodeKind::CData)?;
        self.append_child(parent, id);
        Ok(id)
    }

    /// Appends an embedded document under `parent`.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the arena cannot grow.
    pub fn add_tree(&mut self, parent: NodeId, tree: Tree) -> Result<NodeId, ParseError> {
        let id = self.create_node(NodeKind::Tree {
            tree: Box::new(tree),
        })?;
        self.append_child(parent, id);
        Ok(id)
    }

    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, ParseError> {
        let id = NodeId::from_index(self.nodes.len())
            .ok_or_else(|| ParseError::out_of_memory("node id"))?;
        self.nodes
            .try_reserve(1)
            .map_err(|_| ParseError::out_of_memory("node"))?;
        self.nodes.push(NodeData::new(kind));
        Ok(id)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.tree.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut node = current;
        loop {
            if node == self.root {
                self.next = None;
                break;
            }
            if let Some(sibling) = self.tree.next_sibling(node) {
                self.next = Some(sibling);
                break;
            }
            match self.tree.parent(node) {
                Some(parent) => node = parent,
                None => {
                    self.next = None;
                    break;
                }
            }
        }
        Some(current)
    }
}
