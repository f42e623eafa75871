//! Growable byte buffer for text node payloads.
//!
//! Character data is stored as raw bytes, since the WBXML encoder works on
//! byte strings in the document's charset. Every growth goes through
//! `try_reserve` so an allocation failure surfaces as an error instead of an
//! abort.

use std::collections::TryReserveError;
use std::fmt;

/// A byte buffer with fallible growth.
///
/// # Examples
///
/// ```
/// use wbxml_tree::util::Buffer;
///
/// let mut buf = Buffer::from_slice(b"BEGIN:").unwrap();
/// buf.append(b"VCARD").unwrap();
/// assert_eq!(buf.len(), 11);
/// assert_eq!(buf.as_str(), Some("BEGIN:VCARD"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding a copy of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `TryReserveError` if the allocation fails.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TryReserveError> {
        let mut buf = Self::new();
        buf.append(bytes)?;
        Ok(buf)
    }

    /// Appends `bytes` to the end of the buffer.
    ///
    /// # Errors
    ///
    /// Returns `TryReserveError` if the buffer cannot grow.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), TryReserveError> {
        self.bytes.try_reserve(bytes.len())?;
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the contents as text, if they are valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({:?})", String::from_utf8_lossy(&self.bytes))
    }
}
