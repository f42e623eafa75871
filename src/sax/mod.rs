//! Push-style markup event source.
//!
//! The parser walks the input once and fires callbacks on a [`SaxHandler`]
//! as it encounters declarations, elements, text and CDATA sections. No tree
//! is built here; [`TreeBuilder`](crate::parser::TreeBuilder) is the handler
//! that does that.
//!
//! Element names are reported exactly as written (`prefix:local` stays one
//! string) and no namespace processing takes place. Element events carry the
//! location of the tag's `<`, which lets a handler slice the source text
//! between two events.
//!
//! # Examples
//!
//! ```
//! use wbxml_tree::error::SourceLocation;
//! use wbxml_tree::sax::{parse_sax, SaxHandler};
//! use wbxml_tree::parser::ParseOptions;
//!
//! struct Counter {
//!     elements: usize,
//! }
//!
//! impl SaxHandler for Counter {
//!     fn start_element(&mut self, _: &str, _: &[(String, String)], _: SourceLocation) {
//!         self.elements += 1;
//!     }
//! }
//!
//! let mut counter = Counter { elements: 0 };
//! parse_sax("<SyncML><SyncHdr/><SyncBody/></SyncML>", &ParseOptions::default(), &mut counter)
//!     .unwrap();
//! assert_eq!(counter.elements, 3);
//! ```

use crate::error::{ParseError, SourceLocation};
use crate::parser::scanner::Scanner;
use crate::parser::ParseOptions;

/// Receiver of markup events.
///
/// All methods have default no-op implementations so a handler only
/// overrides what it needs.
#[allow(unused_variables)]
pub trait SaxHandler {
    /// Called before any other event.
    fn start_document(&mut self) {}

    /// Called after the last event of a well-formed document.
    fn end_document(&mut self) {}

    /// Called for the XML declaration.
    fn xml_decl(&mut self, version: Option<&str>, encoding: Option<&str>, standalone: Option<bool>) {
    }

    /// Called for a DOCTYPE declaration. The internal subset, if any, is
    /// skipped and only reported through `has_internal_subset`.
    fn doctype_decl(
        &mut self,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
        has_internal_subset: bool,
    ) {
    }

    /// Called for a start tag or an empty-element tag.
    ///
    /// `location` points at the tag's `<`.
    fn start_element(&mut self, name: &str, attributes: &[(String, String)], location: SourceLocation) {
    }

    /// Called for an end tag, or right after `start_element` for an
    /// empty-element tag, in which case `location` equals the start's.
    fn end_element(&mut self, name: &str, location: SourceLocation) {}

    /// Called when a CDATA section opens.
    fn start_cdata(&mut self) {}

    /// Called when a CDATA section closes.
    fn end_cdata(&mut self) {}

    /// Called for character data. A run of text may arrive in several
    /// chunks; every entity or character reference is a chunk of its own.
    fn characters(&mut self, content: &str) {}

    /// Called for comments.
    fn comment(&mut self, content: &str) {}

    /// Called for processing instructions.
    fn processing_instruction(&mut self, target: &str, data: Option<&str>) {}

    /// Polled after each event. Returning `true` ends the parse early
    /// without an error; the handler is expected to report its own.
    fn stopped(&self) -> bool {
        false
    }
}

/// A handler that ignores every event. Useful to check well-formedness.
pub struct DefaultHandler;

impl SaxHandler for DefaultHandler {}

/// Parses XML from a string, firing events on the provided handler.
///
/// # Errors
///
/// Returns a `ParseError` of kind `XmlParsing` if the input is not
/// well-formed.
pub fn parse_sax(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn SaxHandler,
) -> Result<(), ParseError> {
    let mut parser = SaxParser {
        input: Scanner::new(input, options.max_depth, options.max_name_length),
        handler,
    };
    parser.document()
}

struct SaxParser<'a, 'h> {
    input: Scanner<'a>,
    handler: &'h mut dyn SaxHandler,
}

impl SaxParser<'_, '_> {
    fn stopped(&self) -> bool {
        self.handler.stopped()
    }

    /// `[1] document ::= prolog element Misc*`
    fn document(&mut self) -> Result<(), ParseError> {
        self.handler.start_document();

        if self.input.starts_with("<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
        {
            let decl = self.input.xml_decl()?;
            self.handler
                .xml_decl(Some(decl.version), decl.encoding, decl.standalone);
        }
        self.misc()?;
        if !self.stopped() && self.input.starts_with("<!DOCTYPE") {
            self.doctype()?;
            self.misc()?;
        }
        if self.stopped() {
            return Ok(());
        }

        match (self.input.peek(), self.input.peek_at(1)) {
            (Some(b'<'), Some(next)) if next != b'!' && next != b'?' => self.element()?,
            _ => return Err(self.input.error("document has no root element")),
        }
        self.misc()?;
        if self.stopped() {
            return Ok(());
        }
        if !self.input.at_end() {
            return Err(self.input.error("content after the root element"));
        }

        self.handler.end_document();
        Ok(())
    }

    /// Comments, processing instructions and whitespace outside the root.
    fn misc(&mut self) -> Result<(), ParseError> {
        loop {
            self.input.skip_ws();
            if self.stopped() {
                return Ok(());
            }
            if self.input.starts_with("<!--") {
                self.comment()?;
            } else if self.input.starts_with("<?") {
                self.processing_instruction()?;
            } else {
                return Ok(());
            }
        }
    }

    fn doctype(&mut self) -> Result<(), ParseError> {
        self.input.expect("<!DOCTYPE")?;
        self.input.require_ws("after '<!DOCTYPE'")?;
        let name = self.input.name()?;
        let spaced = self.input.skip_ws();

        let (public_id, system_id) = if spaced && self.input.eat("PUBLIC") {
            self.input.require_ws("after 'PUBLIC'")?;
            let public_id = self.input.literal()?;
            // WAP documents routinely leave out the system literal.
            let system_id = if self.input.skip_ws() && matches!(self.input.peek(), Some(b'"' | b'\'')) {
                Some(self.input.literal()?)
            } else {
                None
            };
            (Some(public_id), system_id)
        } else if spaced && self.input.eat("SYSTEM") {
            self.input.require_ws("after 'SYSTEM'")?;
            (None, Some(self.input.literal()?))
        } else {
            (None, None)
        };

        self.input.skip_ws();
        let has_internal_subset = self.input.peek() == Some(b'[');
        if has_internal_subset {
            self.input.skip_internal_subset()?;
            self.input.skip_ws();
        }
        self.input.expect(">")?;

        self.handler
            .doctype_decl(&name, system_id, public_id, has_internal_subset);
        Ok(())
    }

    fn element(&mut self) -> Result<(), ParseError> {
        self.input.enter_element()?;
        let start = self.input.location();
        self.input.expect("<")?;
        let name = self.input.name()?;
        let attributes = self.attributes(&name)?;

        if self.input.eat("/>") {
            self.handler.start_element(&name, &attributes, start);
            if !self.stopped() {
                self.handler.end_element(&name, start);
            }
        } else {
            self.input.expect(">")?;
            self.handler.start_element(&name, &attributes, start);
            self.content()?;
            if self.stopped() {
                return Ok(());
            }

            let end = self.input.location();
            self.input.expect("</")?;
            let end_name = self.input.name()?;
            if end_name != name {
                return Err(self
                    .input
                    .error(format!("</{end_name}> does not close <{name}>")));
            }
            self.input.skip_ws();
            self.input.expect(">")?;
            self.handler.end_element(&name, end);
        }

        self.input.leave_element();
        Ok(())
    }

    fn attributes(&mut self, element: &str) -> Result<Vec<(String, String)>, ParseError> {
        let mut attributes: Vec<(String, String)> = Vec::new();
        loop {
            let spaced = self.input.skip_ws();
            if self.input.peek() == Some(b'>') || self.input.starts_with("/>") {
                return Ok(attributes);
            }
            if !spaced {
                return Err(self
                    .input
                    .error(format!("whitespace required before an attribute of <{element}>")));
            }
            let name = self.input.name()?;
            if attributes.iter().any(|(n, _)| *n == name) {
                return Err(self
                    .input
                    .error(format!("attribute {name} repeated on <{element}>")));
            }
            self.input.skip_ws();
            self.input.expect("=")?;
            self.input.skip_ws();
            let value = self.input.attribute_value()?;
            attributes.push((name, value));
        }
    }

    /// Everything between a start tag and its end tag.
    fn content(&mut self) -> Result<(), ParseError> {
        while !self.stopped() {
            if self.input.at_end() {
                return Err(self.input.error("unexpected end of input inside an element"));
            }
            if self.input.starts_with("</") {
                break;
            }
            if self.input.starts_with("<![CDATA[") {
                self.cdata()?;
            } else if self.input.starts_with("<!--") {
                self.comment()?;
            } else if self.input.starts_with("<?") {
                self.processing_instruction()?;
            } else if self.input.peek() == Some(b'<') {
                self.element()?;
            } else if self.input.peek() == Some(b'&') {
                let c = self.input.reference()?;
                self.handler.characters(c.encode_utf8(&mut [0; 4]));
            } else {
                let text = self.input.char_data()?;
                self.handler.characters(&text);
            }
        }
        Ok(())
    }

    fn comment(&mut self) -> Result<(), ParseError> {
        self.input.expect("<!--")?;
        let text = self.input.until("-->", "comment")?;
        if text.contains("--") || text.ends_with('-') {
            return Err(self.input.error("'--' inside a comment"));
        }
        self.handler.comment(&text);
        Ok(())
    }

    fn cdata(&mut self) -> Result<(), ParseError> {
        self.input.expect("<![CDATA[")?;
        self.handler.start_cdata();
        if self.stopped() {
            return Ok(());
        }
        let text = self.input.until("]]>", "CDATA section")?;
        if !text.is_empty() {
            self.handler.characters(&text);
            if self.stopped() {
                return Ok(());
            }
        }
        self.handler.end_cdata();
        Ok(())
    }

    fn processing_instruction(&mut self) -> Result<(), ParseError> {
        self.input.expect("<?")?;
        let target = self.input.name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(self
                .input
                .error("processing instruction target 'xml' is reserved"));
        }
        let data = if self.input.eat("?>") {
            None
        } else {
            self.input
                .require_ws("after the processing instruction target")?;
            Some(self.input.until("?>", "processing instruction")?).filter(|d| !d.is_empty())
        };
        self.handler.processing_instruction(&target, data.as_deref());
        Ok(())
    }
}
