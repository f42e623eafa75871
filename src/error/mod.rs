//! Error types and diagnostics for tree building.
//!
//! A tree build either succeeds with a complete [`Tree`](crate::tree::Tree)
//! or fails with exactly one [`ParseError`]. The error's [`ErrorKind`] tells
//! the caller which stage gave up; the first failure latches and later
//! events are ignored, so there is never more than one.
//!
//! Non-fatal problems (an unsupported charset name, a doctype that matches
//! no language table) are collected as [`ParseDiagnostic`]s on the tree.

use std::fmt;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent building the tree.
    Warning,
    /// An unrecoverable error; the build stops.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the (UTF-8) input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single diagnostic emitted while building a tree.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable message.
    pub message: String,
    /// Where in the source this was noticed.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}",
            self.severity, self.message, self.location
        )
    }
}

/// The category of a failed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No language table matched the doctype or the root element name.
    UnknownLanguage,
    /// A node or buffer allocation could not be satisfied.
    OutOfMemory,
    /// The cursor and the tree disagree (event source and builder are out
    /// of sync).
    Internal,
    /// The event source rejected the markup as malformed.
    XmlParsing,
    /// The input bytes could not be decoded to UTF-8.
    Encoding,
    /// Embedded documents were nested deeper than allowed.
    EmbeddingTooDeep,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownLanguage => "unknown XML language",
            Self::OutOfMemory => "not enough memory",
            Self::Internal => "internal error",
            Self::XmlParsing => "XML parsing failed",
            Self::Encoding => "encoding error",
            Self::EmbeddingTooDeep => "embedded documents nested too deeply",
        };
        f.write_str(s)
    }
}

/// The error type returned when a tree cannot be built.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The primary error message.
    pub message: String,
    /// Where in the source the failure occurred.
    pub location: SourceLocation,
    /// Diagnostics collected before the failure.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseError {
    /// Creates an error with no diagnostics attached.
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
            diagnostics: Vec::new(),
        }
    }

    /// Shorthand for an [`ErrorKind::OutOfMemory`] error.
    pub(crate) fn out_of_memory(what: &str) -> Self {
        Self::new(
            ErrorKind::OutOfMemory,
            format!("allocation failed for {what}"),
            SourceLocation::default(),
        )
    }

    /// Shorthand for an [`ErrorKind::Internal`] error.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, SourceLocation::default())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}: {}",
            self.kind, self.location, self.message
        )
    }
}

impl std::error::Error for ParseError {}
