//! Tree serialization.
//!
//! [`serialize`] writes a tree back to XML text; [`dump`] renders an
//! indented outline of the node structure for inspection.

mod dump;
pub mod xml;

pub use dump::dump;
pub use xml::{serialize, serialize_with_options, SerializeOptions};
