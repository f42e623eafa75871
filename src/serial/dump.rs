//! Debug outline of a tree.

use std::fmt::Write;

use crate::tree::{NodeId, NodeKind, Tree};

/// Renders the node structure of `tree`, one node per line.
///
/// Embedded documents are shown nested under their node, headed by their
/// language and charset.
///
/// ```
/// use wbxml_tree::Tree;
/// use wbxml_tree::serial::dump;
///
/// let tree = Tree::from_xml(b"<si><indication href=\"x\">Hi</indication></si>").unwrap();
/// assert_eq!(
///     dump(&tree),
///     "TREE lang=-//WAPFORUM//DTD SI 1.0//EN charset=unknown\n\
///      ELEMENT si\n  ELEMENT indication href=\"x\"\n    TEXT \"Hi\"\n"
/// );
/// ```
#[must_use]
pub fn dump(tree: &Tree) -> String {
    let mut out = String::new();
    dump_tree(tree, &mut out, 0);
    out
}

fn dump_tree(tree: &Tree, out: &mut String, depth: usize) {
    indent(out, depth);
    let lang = tree
        .lang
        .map_or_else(|| "none".to_string(), ToString::to_string);
    let _ = writeln!(out, "TREE lang={lang} charset={}", tree.charset);
    if let Some(root) = tree.root() {
        dump_node(tree, root, out, depth);
    }
}

fn dump_node(tree: &Tree, id: NodeId, out: &mut String, depth: usize) {
    match &tree.node(id).kind {
        NodeKind::Element { name, attributes } => {
            indent(out, depth);
            out.push_str("ELEMENT ");
            out.push_str(name);
            for attr in attributes {
                let _ = write!(out, " {}={:?}", attr.name, attr.value);
            }
            out.push('\n');
        }
        NodeKind::Text { content } => {
            indent(out, depth);
            let _ = writeln!(out, "TEXT {:?}", String::from_utf8_lossy(content.as_bytes()));
        }
        NodeKind::CData => {
            indent(out, depth);
            out.push_str("CDATA\n");
        }
        NodeKind::Tree { tree: embedded } => {
            dump_tree(embedded, out, depth);
            return;
        }
    }
    for child in tree.children(id) {
        dump_node(tree, child, out, depth + 1);
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dump_embedded_and_cdata() {
        let doc = "<SyncML><Add><Item><Data>v</Data></Item></Add>\
                   <Put><DevInf><Man>Acme</Man></DevInf></Put></SyncML>";
        let tree = parse_str(doc).unwrap();
        assert_eq!(
            dump(&tree),
            "TREE lang=-//SYNCML//DTD SyncML 1.0//EN charset=unknown\n\
             ELEMENT SyncML\n\
             \x20 ELEMENT Add\n\
             \x20   ELEMENT Item\n\
             \x20     ELEMENT Data\n\
             \x20       CDATA\n\
             \x20         TEXT \"v\"\n\
             \x20 ELEMENT Put\n\
             \x20   TREE lang=-//SYNCML//DTD DevInf 1.0//EN charset=unknown\n\
             \x20   ELEMENT DevInf\n\
             \x20     ELEMENT Man\n\
             \x20       TEXT \"Acme\"\n"
        );
    }

    #[test]
    fn test_dump_empty_tree() {
        assert_eq!(dump(&Tree::new()), "TREE lang=none charset=unknown\n");
    }
}
