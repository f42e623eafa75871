//! Event-driven tree construction.
//!
//! [`TreeBuilder`] receives markup events and maintains an insertion cursor
//! into the [`Tree`] it owns. Beyond plain element/text insertion it deals
//! with three WBXML-specific concerns:
//!
//! - **Language resolution.** The DOCTYPE picks the language table; failing
//!   that, the root element name does. A document matching neither is
//!   rejected before any node is created.
//! - **Elision.** A non-root element whose name is in
//!   [`ParseOptions::elidable_tags`] is not inserted. Its source text is
//!   captured and parsed as a document of its own, and the result is
//!   attached as a [`NodeKind::Tree`](crate::tree::NodeKind::Tree) node.
//!   This is how SyncML carries `<DevInf>` inside `<Put>`/`<Results>`.
//! - **CDATA recovery.** Character data inside a SyncML `<Data>` whose
//!   payload type is free-form text is wrapped in a synthesized CDATA node,
//!   since clients routinely omit the delimiters.
//!
//! The first failure is latched: every later event is ignored and
//! [`TreeBuilder::finish`] returns that error.

use std::collections::TryReserveError;

use log::{debug, trace, warn};

use super::ParseOptions;
use crate::encoding::Charset;
use crate::error::{ErrorKind, ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};
use crate::sax::SaxHandler;
use crate::tree::syncml::data_category;
use crate::tree::{NodeId, Tree};
use crate::util::Buffer;

/// Mutable state threaded through the event handlers.
#[derive(Debug, Default)]
struct BuildContext {
    /// The first failure; once set the build is over.
    error: Option<ParseError>,
    /// Nesting inside an elided element; 0 when not skipping.
    skip_depth: u32,
    /// Byte offset of the elided element's start tag.
    skip_start: usize,
    /// Name of the elided element.
    skip_tag: Option<String>,
    /// Where the next node goes.
    cursor: Option<NodeId>,
    /// Location of the most recent element event.
    location: SourceLocation,
}

/// A [`SaxHandler`] that builds a [`Tree`].
///
/// Usually driven by [`parse_str_with_options`](super::parse_str_with_options),
/// but any event source can push into it as long as element locations are
/// byte offsets into the `input` given to [`TreeBuilder::new`].
///
/// ```
/// use wbxml_tree::error::SourceLocation;
/// use wbxml_tree::parser::{ParseOptions, TreeBuilder};
/// use wbxml_tree::sax::SaxHandler;
///
/// let options = ParseOptions::default();
/// let mut builder = TreeBuilder::new("", &options);
/// builder.start_element("si", &[], SourceLocation::default());
/// builder.characters("hello");
/// builder.end_element("si", SourceLocation::default());
///
/// let tree = builder.finish(Ok(())).unwrap();
/// assert_eq!(tree.text_content(tree.root().unwrap()), "hello");
/// ```
pub struct TreeBuilder<'a> {
    input: &'a str,
    options: &'a ParseOptions,
    tree: Tree,
    ctx: BuildContext,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder for the document `input`.
    #[must_use]
    pub fn new(input: &'a str, options: &'a ParseOptions) -> Self {
        Self {
            input,
            options,
            tree: Tree::new(),
            ctx: BuildContext::default(),
        }
    }

    /// Returns the tree built so far.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the latched error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.ctx.error.as_ref()
    }

    /// Returns the insertion cursor.
    #[must_use]
    pub fn cursor(&self) -> Option<NodeId> {
        self.ctx.cursor
    }

    /// Returns the current elision nesting depth (0 when not skipping).
    #[must_use]
    pub fn skip_depth(&self) -> u32 {
        self.ctx.skip_depth
    }

    /// Consumes the builder and returns the tree.
    ///
    /// `outcome` is the event source's result. A latched builder error
    /// takes precedence over it; either way the warnings collected so far
    /// are attached to the returned error.
    ///
    /// # Errors
    ///
    /// The latched error, the event source's error, or `Internal` if no
    /// root element was ever opened.
    pub fn finish(self, outcome: Result<(), ParseError>) -> Result<Tree, ParseError> {
        let Self { tree, ctx, .. } = self;

        let mut err = match (ctx.error, outcome) {
            (Some(err), _) | (None, Err(err)) => err,
            (None, Ok(())) if tree.root().is_none() => ParseError::internal("no root element"),
            (None, Ok(())) => return Ok(tree),
        };

        if !tree.diagnostics.is_empty() {
            let mut diagnostics = tree.diagnostics;
            diagnostics.append(&mut err.diagnostics);
            err.diagnostics = diagnostics;
        }
        Err(err)
    }

    fn fail(&mut self, err: ParseError) {
        if self.ctx.error.is_none() {
            self.ctx.error = Some(err);
        }
    }

    fn is_blocked(&self) -> bool {
        self.ctx.error.is_some() || self.ctx.skip_depth > 0
    }

    fn warning(&mut self, message: String) {
        warn!("{message}");
        self.tree.diagnostics.push(ParseDiagnostic {
            severity: ErrorSeverity::Warning,
            message,
            location: self.ctx.location,
        });
    }

    fn internal(&self, message: &str) -> ParseError {
        ParseError::new(ErrorKind::Internal, message, self.ctx.location)
    }

    // --- Elements ---

    fn open_element(
        &mut self,
        name: &str,
        attributes: &[(String, String)],
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        if self.ctx.cursor.is_none() && self.tree.lang.is_none() {
            let table = self.options.registry.by_root(name).ok_or_else(|| {
                ParseError::new(
                    ErrorKind::UnknownLanguage,
                    format!("no language table for root element <{name}>"),
                    location,
                )
            })?;
            debug!("language {table} guessed from root element <{name}>");
            self.tree.lang = Some(table);
        }

        if self.ctx.cursor.is_some() && self.options.is_elidable(name) {
            self.ctx.skip_start = location.byte_offset;
            self.ctx.skip_depth = 1;
            self.ctx.skip_tag = Some(name.to_string());
            return Ok(());
        }

        let node = self.tree.add_element(self.ctx.cursor, name, attributes)?;
        self.ctx.cursor = Some(node);
        Ok(())
    }

    fn close_element(&mut self) -> Result<(), ParseError> {
        let cursor = self
            .ctx
            .cursor
            .ok_or_else(|| self.internal("end tag without an open element"))?;

        let Some(parent) = self.tree.parent(cursor) else {
            if self.tree.root() != Some(cursor) {
                return Err(self.internal("detached node at the cursor"));
            }
            return Ok(());
        };

        // A synthesized CDATA ends with the element holding it.
        let parent = if self.tree.is_cdata(cursor) {
            self.tree
                .parent(parent)
                .ok_or_else(|| self.internal("recovered CDATA directly under the root"))?
        } else {
            parent
        };
        self.ctx.cursor = Some(parent);
        Ok(())
    }

    // --- Elision ---

    fn close_elided(&mut self, name: &str, location: SourceLocation) -> Result<(), ParseError> {
        if self.ctx.skip_tag.as_deref() != Some(name) {
            return Err(ParseError::new(
                ErrorKind::Internal,
                format!(
                    "</{name}> closes elided <{}>",
                    self.ctx.skip_tag.as_deref().unwrap_or_default()
                ),
                location,
            ));
        }

        let cursor = self
            .ctx
            .cursor
            .ok_or_else(|| self.internal("elided element outside the root"))?;

        if self.options.embed_depth >= self.options.max_embed_depth {
            return Err(ParseError::new(
                ErrorKind::EmbeddingTooDeep,
                format!(
                    "<{name}> nested deeper than {} embedded documents",
                    self.options.max_embed_depth
                ),
                location,
            ));
        }

        let fragment = self.embedded_fragment(name, location)?;
        debug!(
            "parsing embedded <{name}> document ({} bytes, depth {})",
            fragment.len(),
            self.options.embed_depth + 1
        );
        let text = fragment
            .as_str()
            .ok_or_else(|| self.internal("embedded document is not UTF-8"))?;
        let embedded = super::parse_str_with_options(text, &self.options.nested())?;

        self.tree.add_tree(cursor, embedded)?;
        self.ctx.skip_depth = 0;
        self.ctx.skip_tag = None;
        Ok(())
    }

    /// Returns the source text of the elided element ending at `end`.
    ///
    /// For `<Name ...>...</Name>` this is everything from the start tag up
    /// to the end tag, plus a closing tag. For an empty-element tag, both
    /// events carry the same offset and the tag itself is the fragment.
    fn embedded_fragment(&self, name: &str, end: SourceLocation) -> Result<Buffer, ParseError> {
        let start = self.ctx.skip_start;
        let end = end.byte_offset;
        let oom = |_: TryReserveError| ParseError::out_of_memory("embedded document");

        if end == start {
            let rest = self.input.get(start..).unwrap_or_default();
            let len = empty_tag_len(rest)
                .ok_or_else(|| self.internal("unterminated empty-element tag"))?;
            return Buffer::from_slice(rest[..len].as_bytes()).map_err(oom);
        }

        let body = self
            .input
            .get(start..end)
            .ok_or_else(|| self.internal("elided element offsets out of range"))?;
        let mut fragment = Buffer::from_slice(body.as_bytes()).map_err(oom)?;
        for piece in ["</", name, ">"] {
            fragment.append(piece.as_bytes()).map_err(oom)?;
        }
        Ok(fragment)
    }

    // --- Character data ---

    fn add_characters(&mut self, content: &str) -> Result<(), ParseError> {
        let cursor = self
            .ctx
            .cursor
            .ok_or_else(|| self.internal("character data outside the root element"))?;

        let mut target = cursor;
        if self.options.recover_cdata && data_category(&self.tree, cursor).is_recoverable() {
            let wrapped = self.tree.is_cdata(cursor)
                || self
                    .tree
                    .last_child(cursor)
                    .is_some_and(|last| self.tree.is_cdata(last));
            if !wrapped {
                trace!("wrapping undelimited SyncML payload in CDATA");
                target = self.tree.add_cdata(cursor)?;
                self.ctx.cursor = Some(target);
            }
        }

        self.tree.add_text(target, content.as_bytes())?;
        Ok(())
    }
}

/// Length of the empty-element tag at the start of `s`, up to and
/// including `/>`. Quoted attribute values may contain `>`.
fn empty_tag_len(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}

impl SaxHandler for TreeBuilder<'_> {
    fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, _standalone: Option<bool>) {
        if self.is_blocked() {
            return;
        }
        // A missing version marks a text declaration, which carries no
        // document charset.
        let (Some(_), Some(encoding)) = (version, encoding) else {
            return;
        };
        match Charset::from_name(encoding) {
            Some(charset) => self.tree.charset = charset,
            None => self.warning(format!("charset encoding not supported: {encoding}")),
        }
    }

    fn doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        _has_internal_subset: bool,
    ) {
        if self.is_blocked() {
            return;
        }
        match self.options.registry.by_doctype(public_id, system_id) {
            Some(table) => {
                debug!("language {table} selected by DOCTYPE {name}");
                self.tree.lang = Some(table);
            }
            None => self.warning(format!(
                "no language table for DOCTYPE {name} (public {public_id:?}, system {system_id:?})"
            )),
        }
    }

    fn start_element(&mut self, name: &str, attributes: &[(String, String)], location: SourceLocation) {
        if self.ctx.error.is_some() {
            return;
        }
        if self.ctx.skip_depth > 0 {
            self.ctx.skip_depth += 1;
            return;
        }
        self.ctx.location = location;
        if let Err(err) = self.open_element(name, attributes, location) {
            self.fail(err);
        }
    }

    fn end_element(&mut self, name: &str, location: SourceLocation) {
        if self.ctx.error.is_some() {
            return;
        }
        match self.ctx.skip_depth {
            0 => {}
            1 => {
                self.ctx.location = location;
                if let Err(err) = self.close_elided(name, location) {
                    self.fail(err);
                }
                return;
            }
            _ => {
                self.ctx.skip_depth -= 1;
                return;
            }
        }
        self.ctx.location = location;
        if let Err(err) = self.close_element() {
            self.fail(err);
        }
    }

    fn start_cdata(&mut self) {
        if self.is_blocked() {
            return;
        }
        let result = match self.ctx.cursor {
            Some(cursor) => self.tree.add_cdata(cursor),
            None => Err(self.internal("CDATA section outside the root element")),
        };
        match result {
            Ok(cdata) => self.ctx.cursor = Some(cdata),
            Err(err) => self.fail(err),
        }
    }

    fn end_cdata(&mut self) {
        if self.is_blocked() {
            return;
        }
        let Some(cursor) = self.ctx.cursor else {
            let err = self.internal("end of CDATA without an open node");
            self.fail(err);
            return;
        };
        match self.tree.parent(cursor) {
            Some(parent) => self.ctx.cursor = Some(parent),
            None if self.tree.root() == Some(cursor) => {}
            None => {
                let err = self.internal("detached node at the cursor");
                self.fail(err);
            }
        }
    }

    fn characters(&mut self, content: &str) {
        if self.is_blocked() {
            return;
        }
        if let Err(err) = self.add_characters(content) {
            self.fail(err);
        }
    }

    /// Processing instructions carry nothing a WBXML tree can hold.
    fn processing_instruction(&mut self, _target: &str, _data: Option<&str>) {}

    fn stopped(&self) -> bool {
        self.ctx.error.is_some()
    }
}
