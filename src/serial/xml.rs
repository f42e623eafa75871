//! XML serializer.
//!
//! Writes a [`Tree`] back out as XML text. Embedded documents are inlined
//! where their node sits, so the output reads like the source did before
//! elision.

use std::fmt::Write;

use crate::encoding::Charset;
use crate::tree::{Attribute, NodeId, NodeKind, Tree};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use wbxml_tree::Tree;
/// use wbxml_tree::serial::{serialize_with_options, SerializeOptions};
///
/// let tree = Tree::from_xml(b"<si><indication>Hello</indication></si>").unwrap();
/// let xml = serialize_with_options(&tree, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <indication>"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
    /// Whether to start with an XML declaration. Defaults to `true`.
    pub xml_declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
            xml_declaration: true,
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented output.
    ///
    /// Elements holding text or CDATA are never indented inside, so payloads
    /// come out unchanged.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }

    /// Enables or disables the leading XML declaration.
    #[must_use]
    pub fn xml_declaration(mut self, yes: bool) -> Self {
        self.xml_declaration = yes;
        self
    }
}

/// Serializes a tree to an XML string.
///
/// # Examples
///
/// ```
/// use wbxml_tree::Tree;
/// use wbxml_tree::serial::serialize;
///
/// let tree = Tree::from_xml(b"<si><indication href=\"a&amp;b\">Hi</indication></si>").unwrap();
/// assert_eq!(
///     serialize(&tree),
///     "<?xml version=\"1.0\"?>\n<si><indication href=\"a&amp;b\">Hi</indication></si>\n"
/// );
/// ```
#[must_use]
pub fn serialize(tree: &Tree) -> String {
    serialize_with_options(tree, &SerializeOptions::default())
}

/// Serializes a tree to an XML string with the given options.
#[must_use]
pub fn serialize_with_options(tree: &Tree, options: &SerializeOptions) -> String {
    let mut writer = XmlWriter {
        out: String::new(),
        options,
    };
    if options.xml_declaration {
        writer.declaration(tree);
    }
    if let Some(root) = tree.root() {
        writer.node(tree, root, 0, false);
    }
    writer.out.push('\n');
    writer.out
}

struct XmlWriter<'o> {
    out: String,
    options: &'o SerializeOptions,
}

impl XmlWriter<'_> {
    /// The output is always UTF-8. A declared source charset is replaced by
    /// `UTF-8`; without one the encoding is left out.
    fn declaration(&mut self, tree: &Tree) {
        if tree.charset == Charset::Unknown {
            self.out.push_str("<?xml version=\"1.0\"?>\n");
        } else {
            self.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
    }

    /// Writes `id` at nesting `depth`. `own_line` is set when the parent
    /// holds only elements and indentation is on.
    fn node(&mut self, tree: &Tree, id: NodeId, depth: usize, own_line: bool) {
        match &tree.node(id).kind {
            NodeKind::Element { name, attributes } => {
                if own_line {
                    self.indent(depth);
                }
                self.element(tree, id, name, attributes, depth);
                if own_line {
                    self.out.push('\n');
                }
            }
            NodeKind::Text { content } => {
                escape_into(&mut self.out, &String::from_utf8_lossy(content.as_bytes()), false);
            }
            NodeKind::CData => self.cdata(tree, id, depth),
            NodeKind::Tree { tree: embedded } => {
                if let Some(root) = embedded.root() {
                    self.node(embedded, root, depth, own_line);
                }
            }
        }
    }

    fn element(
        &mut self,
        tree: &Tree,
        id: NodeId,
        name: &str,
        attributes: &[Attribute],
        depth: usize,
    ) {
        let _ = write!(self.out, "<{name}");
        for attr in attributes {
            let _ = write!(self.out, " {}=\"", attr.name);
            escape_into(&mut self.out, &attr.value, true);
            self.out.push('"');
        }
        if tree.first_child(id).is_none() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let block = self.options.indent && holds_only_elements(tree, id);
        if block {
            self.out.push('\n');
        }
        for child in tree.children(id) {
            if block && is_blank_text(tree, child) {
                continue;
            }
            self.node(tree, child, depth + 1, block);
        }
        if block {
            self.indent(depth);
        }
        let _ = write!(self.out, "</{name}>");
    }

    /// Writes the text of a CDATA node as CDATA sections. Recovery can
    /// leave elements and embedded trees inside one; the section is closed
    /// around each of them.
    fn cdata(&mut self, tree: &Tree, id: NodeId, depth: usize) {
        if tree.first_child(id).is_none() {
            self.out.push_str("<![CDATA[]]>");
            return;
        }
        let mut open = false;
        for child in tree.children(id) {
            if let Some(text) = tree.text(child) {
                if !open {
                    self.out.push_str("<![CDATA[");
                    open = true;
                }
                // A literal "]]>" has to be split across two sections.
                let text = String::from_utf8_lossy(text.as_bytes());
                self.out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
            } else {
                if open {
                    self.out.push_str("]]>");
                    open = false;
                }
                self.node(tree, child, depth + 1, false);
            }
        }
        if open {
            self.out.push_str("]]>");
        }
    }

    fn indent(&mut self, depth: usize) {
        self.out.push_str(&self.options.indent_str.repeat(depth));
    }
}

/// Element children only, apart from blank text. Payloads are never
/// indented.
fn holds_only_elements(tree: &Tree, id: NodeId) -> bool {
    let mut elements = 0;
    for child in tree.children(id) {
        match &tree.node(child).kind {
            NodeKind::Element { .. } | NodeKind::Tree { .. } => elements += 1,
            NodeKind::Text { .. } if is_blank_text(tree, child) => {}
            _ => return false,
        }
    }
    elements > 0
}

fn is_blank_text(tree: &Tree, id: NodeId) -> bool {
    tree.text(id)
        .is_some_and(|t| t.as_bytes().iter().all(u8::is_ascii_whitespace))
}

/// Escapes markup characters. Line ends and other control characters
/// become character references where a parser would otherwise alter
/// them: always for `\r`, and for `\t`/`\n` inside attribute values.
fn escape_into(out: &mut String, text: &str, in_attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\t' | '\n' if !in_attribute => out.push(c),
            '\0'..='\u{1f}' => {
                let _ = write!(out, "&#{};", u32::from(c));
            }
            _ => out.push(c),
        }
    }
}
