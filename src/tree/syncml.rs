//! SyncML payload classification.
//!
//! A SyncML `<Data>` element carries an opaque payload whose format is named
//! by the `<Meta><Type>` of the enclosing command or item. Some clients send
//! vCard or vCalendar payloads without the CDATA section the format calls
//! for, and the builder needs to know which `<Data>` elements that can
//! happen to.
//!
//! ```xml
//! <Add>
//!   <Meta><Type xmlns='syncml:metinf'>text/x-vcard</Type></Meta>
//!   <Item>
//!     <Data>BEGIN:VCARD
//! VERSION:2.1
//! END:VCARD</Data>
//!   </Item>
//! </Add>
//! ```

use super::{NodeId, NodeKind, Tree};

/// The payload format of a SyncML `<Data>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    /// Not a `<Data>` element, or a payload with no special treatment.
    Normal,
    /// `application/vnd.syncml-devinf+wbxml`.
    Wbxml,
    /// `text/clear`.
    Clear,
    /// `text/directory;profile=vCard`.
    DirectoryVCard,
    /// `text/x-vcard`.
    VCard,
    /// `text/x-vcalendar`.
    VCalendar,
    /// Untyped payload of an `<Add>` or `<Replace>` item.
    VObject,
}

impl DataCategory {
    /// Returns `true` for free-form text payloads that are known to arrive
    /// without CDATA delimiters.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::Clear | Self::DirectoryVCard | Self::VCard | Self::VCalendar | Self::VObject
        )
    }

    fn from_content_type(content_type: &[u8]) -> Option<Self> {
        match content_type {
            b"application/vnd.syncml-devinf+wbxml" => Some(Self::Wbxml),
            b"text/clear" => Some(Self::Clear),
            b"text/directory;profile=vCard" => Some(Self::DirectoryVCard),
            b"text/x-vcard" => Some(Self::VCard),
            b"text/x-vcalendar" => Some(Self::VCalendar),
            _ => None,
        }
    }
}

/// Classifies `node` as a SyncML payload.
///
/// Only `<Data>` elements are ever classified. The `<Meta><Type>` is looked
/// up among the siblings of `<Data>` first, then among the siblings of its
/// parent. A `<Data>` two levels below `<Add>` or `<Replace>` without a
/// known type counts as [`DataCategory::VObject`].
#[must_use]
pub fn data_category(tree: &Tree, node: NodeId) -> DataCategory {
    if tree.node_name(node) != Some("Data") {
        return DataCategory::Normal;
    }

    let parent = tree.parent(node);
    let grandparent = parent.and_then(|p| tree.parent(p));

    let content_type = parent
        .and_then(|p| meta_type(tree, p))
        .or_else(|| grandparent.and_then(|g| meta_type(tree, g)));

    if let Some(category) = content_type.and_then(|t| type_category(tree, t)) {
        return category;
    }

    match grandparent.and_then(|g| tree.node_name(g)) {
        Some("Add" | "Replace") => DataCategory::VObject,
        _ => DataCategory::Normal,
    }
}

/// Finds `<Meta><Type>` among the children of `parent`.
fn meta_type(tree: &Tree, parent: NodeId) -> Option<NodeId> {
    let meta = child_element(tree, parent, "Meta")?;
    child_element(tree, meta, "Type")
}

fn type_category(tree: &Tree, type_node: NodeId) -> Option<DataCategory> {
    let first = tree.first_child(type_node)?;
    match &tree.node(first).kind {
        NodeKind::Text { content } => DataCategory::from_content_type(content.as_bytes()),
        _ => None,
    }
}

fn child_element(tree: &Tree, parent: NodeId, name: &str) -> Option<NodeId> {
    tree.children(parent)
        .find(|&child| tree.node_name(child) == Some(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Builds `<cmd><Meta><Type>ty</Type></Meta><Item><Data/></Item></cmd>`
    /// (or without Meta when `ty` is `None`) and returns the Data node.
    fn command_with_item(cmd: &str, ty: Option<&str>) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let root = tree.add_element(None, cmd, &[]).unwrap();
        if let Some(ty) = ty {
            let meta = tree.add_element(Some(root), "Meta", &[]).unwrap();
            let t = tree.add_element(Some(meta), "Type", &[]).unwrap();
            tree.add_text(t, ty.as_bytes()).unwrap();
        }
        let item = tree.add_element(Some(root), "Item", &[]).unwrap();
        let data = tree.add_element(Some(item), "Data", &[]).unwrap();
        (tree, data)
    }

    #[test]
    fn test_type_on_command() {
        let (tree, data) = command_with_item("Sync", Some("text/x-vcard"));
        assert_eq!(data_category(&tree, data), DataCategory::VCard);
    }

    #[test]
    fn test_type_on_item() {
        let mut tree = Tree::new();
        let item = tree.add_element(None, "Item", &[]).unwrap();
        let meta = tree.add_element(Some(item), "Meta", &[]).unwrap();
        let t = tree.add_element(Some(meta), "Type", &[]).unwrap();
        tree.add_text(t, b"text/x-vcalendar").unwrap();
        let data = tree.add_element(Some(item), "Data", &[]).unwrap();
        assert_eq!(data_category(&tree, data), DataCategory::VCalendar);
    }

    #[test]
    fn test_all_content_types() {
        for (ty, expected) in [
            ("application/vnd.syncml-devinf+wbxml", DataCategory::Wbxml),
            ("text/clear", DataCategory::Clear),
            ("text/directory;profile=vCard", DataCategory::DirectoryVCard),
            ("text/x-vcard", DataCategory::VCard),
            ("text/x-vcalendar", DataCategory::VCalendar),
        ] {
            let (tree, data) = command_with_item("Sync", Some(ty));
            assert_eq!(data_category(&tree, data), expected, "{ty}");
        }
    }

    #[test]
    fn test_untyped_add_and_replace_are_vobjects() {
        for cmd in ["Add", "Replace"] {
            let (tree, data) = command_with_item(cmd, None);
            assert_eq!(data_category(&tree, data), DataCategory::VObject);
        }
        let (tree, data) = command_with_item("Delete", None);
        assert_eq!(data_category(&tree, data), DataCategory::Normal);
    }

    #[test]
    fn test_unknown_type_in_add_is_vobject() {
        let (tree, data) = command_with_item("Add", Some("image/png"));
        assert_eq!(data_category(&tree, data), DataCategory::VObject);
    }

    #[test]
    fn test_non_data_elements_are_normal() {
        let (tree, data) = command_with_item("Add", Some("text/x-vcard"));
        let item = tree.parent(data).unwrap();
        assert_eq!(data_category(&tree, item), DataCategory::Normal);
    }

    #[test]
    fn test_recoverable_set() {
        assert!(DataCategory::VCard.is_recoverable());
        assert!(DataCategory::VObject.is_recoverable());
        assert!(DataCategory::Clear.is_recoverable());
        assert!(!DataCategory::Wbxml.is_recoverable());
        assert!(!DataCategory::Normal.is_recoverable());
    }
}
