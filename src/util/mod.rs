//! Utility types shared by the tree and the builder.

mod buffer;

pub use buffer::Buffer;
