//! # wbxml-tree
//!
//! Builds the in-memory document tree a WBXML encoder works from, out of
//! XML text. On top of plain tree building it resolves the document's
//! language table (WML, SI, SL, SyncML, DevInf, ...), parses elided
//! sub-documents such as SyncML `<DevInf>` separately, and repairs SyncML
//! vCard/vCalendar payloads that lack their CDATA delimiters.
//!
//! ## Quick Start
//!
//! ```
//! use wbxml_tree::lang::Language;
//! use wbxml_tree::Tree;
//!
//! let tree = Tree::from_xml(b"<si><indication href=\"http://x\">Hi</indication></si>").unwrap();
//! let root = tree.root().unwrap();
//! assert_eq!(tree.node_name(root), Some("si"));
//! assert_eq!(tree.lang.map(|l| l.language), Some(Language::Si10));
//! ```

pub mod encoding;
pub mod error;
pub mod lang;
pub mod parser;
pub mod sax;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use error::{ErrorKind, ParseError};
pub use parser::ParseOptions;
pub use tree::{Attribute, NodeId, Tree};
