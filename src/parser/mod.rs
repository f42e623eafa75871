//! XML to tree conversion.
//!
//! The entry points decode the input, run the event source from
//! [`sax`](crate::sax) over it, and let a [`TreeBuilder`] assemble the
//! [`Tree`]. Elided sub-documents are parsed by calling
//! [`parse_str_with_options`] again on the captured fragment.

mod builder;
pub(crate) mod scanner;

pub use builder::TreeBuilder;

use std::sync::Arc;

use crate::error::ParseError;
use crate::lang::{LanguageRegistry, MainTables};
use crate::sax;
use crate::tree::Tree;

use scanner::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LENGTH};

/// Default nesting limit for embedded documents.
pub const DEFAULT_MAX_EMBED_DEPTH: u32 = 16;

/// Element names elided and re-parsed by default.
pub const DEFAULT_ELIDABLE_TAGS: &[&str] = &["DevInf"];

/// Options controlling tree building and parser limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use wbxml_tree::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .elidable_tags(["DevInf", "Ext"])
///     .recover_cdata(false)
///     .max_embed_depth(4);
/// assert!(opts.is_elidable("Ext"));
/// ```
pub struct ParseOptions {
    /// Element names whose non-root occurrences are captured and parsed as
    /// separate documents (default: `["DevInf"]`).
    pub elidable_tags: Vec<String>,
    /// If true, wrap undelimited SyncML vCard/vCalendar payloads in a CDATA
    /// node (default: true).
    pub recover_cdata: bool,
    /// Maximum nesting of embedded documents (default: 16).
    pub max_embed_depth: u32,

    // -- Security limits --
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,

    /// Language tables used to resolve the document type.
    pub registry: Arc<dyn LanguageRegistry + Send + Sync>,

    /// How many embedded documents enclose the one being parsed.
    pub(crate) embed_depth: u32,
}

impl Clone for ParseOptions {
    fn clone(&self) -> Self {
        Self {
            elidable_tags: self.elidable_tags.clone(),
            recover_cdata: self.recover_cdata,
            max_embed_depth: self.max_embed_depth,
            max_depth: self.max_depth,
            max_name_length: self.max_name_length,
            registry: Arc::clone(&self.registry),
            embed_depth: self.embed_depth,
        }
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("elidable_tags", &self.elidable_tags)
            .field("recover_cdata", &self.recover_cdata)
            .field("max_embed_depth", &self.max_embed_depth)
            .field("max_depth", &self.max_depth)
            .field("max_name_length", &self.max_name_length)
            .field("registry", &"...")
            .field("embed_depth", &self.embed_depth)
            .finish()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            elidable_tags: DEFAULT_ELIDABLE_TAGS.iter().map(|t| (*t).to_string()).collect(),
            recover_cdata: true,
            max_embed_depth: DEFAULT_MAX_EMBED_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            registry: Arc::new(MainTables),
            embed_depth: 0,
        }
    }
}

impl ParseOptions {
    /// Replaces the set of elidable element names.
    #[must_use]
    pub fn elidable_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elidable_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables CDATA recovery for SyncML payloads.
    #[must_use]
    pub fn recover_cdata(mut self, yes: bool) -> Self {
        self.recover_cdata = yes;
        self
    }

    /// Sets the maximum nesting of embedded documents.
    #[must_use]
    pub fn max_embed_depth(mut self, max: u32) -> Self {
        self.max_embed_depth = max;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Sets the language registry.
    #[must_use]
    pub fn registry(mut self, registry: impl LanguageRegistry + Send + Sync + 'static) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Returns `true` if `name` is one of the elidable element names.
    #[must_use]
    pub fn is_elidable(&self, name: &str) -> bool {
        self.elidable_tags.iter().any(|t| t == name)
    }

    /// Options for a document embedded one level deeper.
    pub(crate) fn nested(&self) -> Self {
        let mut options = self.clone();
        options.embed_depth += 1;
        options
    }
}

/// Builds a tree from raw bytes with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input cannot be decoded, is not well-formed,
/// or matches no language table.
pub fn parse_bytes(input: &[u8]) -> Result<Tree, ParseError> {
    parse_bytes_with_options(input, &ParseOptions::default())
}

/// Builds a tree from raw bytes with the given options.
///
/// The bytes are decoded to UTF-8 first (BOM, then the XML declaration's
/// `encoding`). Offsets seen by the builder index the decoded text.
///
/// # Errors
///
/// See [`parse_bytes`].
pub fn parse_bytes_with_options(input: &[u8], options: &ParseOptions) -> Result<Tree, ParseError> {
    let text = crate::encoding::decode_to_utf8(input)?;
    parse_str_with_options(&text, options)
}

/// Builds a tree from a string with default options.
///
/// # Errors
///
/// See [`parse_bytes`].
pub fn parse_str(input: &str) -> Result<Tree, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Builds a tree from a string with the given options.
///
/// # Errors
///
/// See [`parse_bytes`]. Errors of embedded documents are returned as they
/// were raised.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Tree, ParseError> {
    let mut builder = TreeBuilder::new(input, options);
    let outcome = sax::parse_sax(input, options, &mut builder);
    builder.finish(outcome)
}
