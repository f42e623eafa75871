//! Character-level scanning for the event source.
//!
//! [`Scanner`] walks the decoded UTF-8 document, keeps line, column and
//! byte offset up to date, and knows the lexical pieces of XML 1.0: names,
//! references, quoted literals and delimited runs such as comments. Markup
//! structure is left to [`crate::sax`].
//!
//! Only the five predefined entities and character references are
//! expanded. Nothing is ever loaded from outside the input.

use crate::error::{ErrorKind, ParseError, SourceLocation};

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum length (in bytes) of an element or attribute name.
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// `[2] Char`
fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// `[4] NameStartChar`
fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// `[4a] NameChar`
fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// The pseudo-attributes of an XML declaration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct XmlDeclaration<'a> {
    pub version: &'a str,
    pub encoding: Option<&'a str>,
    pub standalone: Option<bool>,
}

/// Position-tracking reader over the document text.
pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    max_depth: u32,
    max_name_length: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str, max_depth: u32, max_name_length: usize) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth,
            max_name_length,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    /// Creates an `XmlParsing` error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(ErrorKind::XmlParsing, message, self.location())
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// The unread part of the input.
    pub fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or_default()
    }

    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Moves forward `len` bytes; `len` has to land on a char boundary.
    fn bump(&mut self, len: usize) {
        let end = (self.pos + len).min(self.src.len());
        for c in self.src.get(self.pos..end).unwrap_or_default().chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    /// Consumes `s` if the input continues with it.
    pub fn eat(&mut self, s: &str) -> bool {
        let found = self.starts_with(s);
        if found {
            self.bump(s.len());
        }
        found
    }

    pub fn expect(&mut self, s: &str) -> Result<(), ParseError> {
        if self.eat(s) {
            return Ok(());
        }
        Err(match self.rest().chars().next() {
            Some(found) => self.error(format!("expected '{s}', found '{found}'")),
            None => self.error(format!("expected '{s}', found end of input")),
        })
    }

    /// Skips `S`. Returns whether anything was skipped.
    pub fn skip_ws(&mut self) -> bool {
        let rest = self.rest();
        let len = rest.len() - rest.trim_start_matches(is_space).len();
        self.bump(len);
        len > 0
    }

    pub fn require_ws(&mut self, context: &str) -> Result<(), ParseError> {
        if self.skip_ws() {
            Ok(())
        } else {
            Err(self.error(format!("whitespace required {context}")))
        }
    }

    // --- Element nesting ---

    pub fn enter_element(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.error(format!(
                "element nesting depth exceeds {}",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // --- Lexical pieces ---

    /// Consumes one character. Line ends are normalized to `\n`.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let c = self
            .rest()
            .chars()
            .next()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        if !is_xml_char(c) {
            return Err(self.error(format!("illegal character U+{:04X}", c as u32)));
        }
        self.bump(c.len_utf8());
        if c == '\r' {
            self.eat("\n");
            return Ok('\n');
        }
        Ok(c)
    }

    /// `[5] Name`. Prefixed names come back whole.
    pub fn name(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if is_name_start_char(c) => {}
            Some((_, c)) => return Err(self.error(format!("'{c}' cannot start a name"))),
            None => return Err(self.error("expected a name, found end of input")),
        }
        let len = chars
            .find(|&(_, c)| !is_name_char(c))
            .map_or(rest.len(), |(i, _)| i);
        if len > self.max_name_length {
            return Err(self.error(format!(
                "name length {len} exceeds the limit of {}",
                self.max_name_length
            )));
        }
        self.bump(len);
        Ok(rest[..len].to_string())
    }

    /// Expands the entity or character reference starting at `&`.
    pub fn reference(&mut self) -> Result<char, ParseError> {
        self.expect("&")?;
        let rest = self.rest();
        let end = rest
            .find(';')
            .ok_or_else(|| self.error("reference is missing its ';'"))?;
        let body = &rest[..end];

        let c = if let Some(number) = body.strip_prefix('#') {
            let (digits, radix) = match number.strip_prefix('x') {
                Some(hex) => (hex, 16),
                None => (number, 10),
            };
            let value = if !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)) {
                u32::from_str_radix(digits, radix).ok()
            } else {
                None
            };
            value
                .and_then(char::from_u32)
                .filter(|&c| is_xml_char(c))
                .ok_or_else(|| self.error(format!("&{body}; is not a legal character reference")))?
        } else {
            match body {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "apos" => '\'',
                "quot" => '"',
                _ => return Err(self.error(format!("undefined entity &{body};"))),
            }
        };
        self.bump(end + 1);
        Ok(c)
    }

    fn open_quote(&mut self) -> Result<u8, ParseError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.bump(1);
                Ok(q)
            }
            _ => Err(self.error("expected a quoted value")),
        }
    }

    /// A quoted literal taken as is (system and public identifiers,
    /// declaration pseudo-attributes).
    pub fn literal(&mut self) -> Result<&'a str, ParseError> {
        let quote = char::from(self.open_quote()?);
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error("quoted literal is not terminated"))?;
        self.bump(end + 1);
        Ok(&rest[..end])
    }

    /// An attribute value with references expanded and whitespace
    /// characters turned into spaces.
    pub fn attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.open_quote()?;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("attribute value is not terminated")),
                Some(b) if b == quote => {
                    self.bump(1);
                    return Ok(value);
                }
                Some(b'&') => value.push(self.reference()?),
                Some(b'<') => return Err(self.error("'<' in attribute value")),
                Some(_) => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    c => value.push(c),
                },
            }
        }
    }

    /// Character data up to the next `<` or `&`.
    pub fn char_data(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let len = rest.find(|c: char| c == '<' || c == '&').unwrap_or(rest.len());
        if let Some(at) = rest[..len].find("]]>") {
            self.bump(at);
            return Err(self.error("']]>' in character data"));
        }
        self.take_text(len)
    }

    /// Text up to `delim`, which is consumed as well. `what` names the
    /// construct for the error message.
    pub fn until(&mut self, delim: &str, what: &str) -> Result<String, ParseError> {
        let len = self
            .rest()
            .find(delim)
            .ok_or_else(|| self.error(format!("unexpected end of input in {what}")))?;
        let text = self.take_text(len)?;
        self.bump(delim.len());
        Ok(text)
    }

    fn take_text(&mut self, len: usize) -> Result<String, ParseError> {
        let stop = self.pos + len;
        let mut text = String::with_capacity(len);
        while self.pos < stop {
            text.push(self.next_char()?);
        }
        Ok(text)
    }

    // --- Prolog ---

    /// Skips a DOCTYPE internal subset, brackets included.
    pub fn skip_internal_subset(&mut self) -> Result<(), ParseError> {
        self.expect("[")?;
        let mut depth = 1u32;
        while depth > 0 {
            if self.eat("<!--") {
                self.until("-->", "comment")?;
                continue;
            }
            match self.peek() {
                None => return Err(self.error("unexpected end of input in internal subset")),
                Some(b'"' | b'\'') => {
                    self.literal()?;
                }
                Some(b'[') => {
                    depth += 1;
                    self.bump(1);
                }
                Some(b']') => {
                    depth -= 1;
                    self.bump(1);
                }
                Some(_) => {
                    self.next_char()?;
                }
            }
        }
        Ok(())
    }

    /// `[23] XMLDecl`
    pub fn xml_decl(&mut self) -> Result<XmlDeclaration<'a>, ParseError> {
        self.expect("<?xml")?;
        self.require_ws("after '<?xml'")?;

        let Some(version) = self.pseudo_attribute("version")? else {
            return Err(self.error("XML declaration has no version"));
        };
        if !is_version_num(version) {
            return Err(self.error(format!("unsupported XML version '{version}'")));
        }

        let mut spaced = self.skip_ws();
        let encoding = if spaced {
            self.pseudo_attribute("encoding")?
        } else {
            None
        };
        if let Some(name) = encoding {
            if !is_enc_name(name) {
                return Err(self.error(format!("malformed encoding name '{name}'")));
            }
            spaced = self.skip_ws();
        }

        let standalone = match spaced.then(|| self.pseudo_attribute("standalone")) {
            None => None,
            Some(value) => match value? {
                None => None,
                Some("yes") => Some(true),
                Some("no") => Some(false),
                Some(other) => {
                    return Err(self.error(format!("standalone must be 'yes' or 'no', not '{other}'")))
                }
            },
        };

        self.skip_ws();
        self.expect("?>")?;
        Ok(XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }

    /// `name = "value"`, or `None` if the input does not continue with `name`.
    fn pseudo_attribute(&mut self, name: &str) -> Result<Option<&'a str>, ParseError> {
        if !self.eat(name) {
            return Ok(None);
        }
        self.skip_ws();
        self.expect("=")?;
        self.skip_ws();
        self.literal().map(Some)
    }
}

/// `[26] VersionNum ::= '1.' [0-9]+`
fn is_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// `[81] EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_enc_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(s: &str) -> Scanner<'_> {
        Scanner::new(s, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LENGTH)
    }

    #[test]
    fn test_location_tracks_lines_and_chars() {
        let mut s = scan("a\n\u{e9}bc");
        s.next_char().unwrap();
        s.next_char().unwrap();
        s.next_char().unwrap();
        let loc = s.location();
        assert_eq!((loc.line, loc.column, loc.byte_offset), (2, 2, 4));
    }

    #[test]
    fn test_line_end_normalization() {
        let mut s = scan("\r\nx\ry");
        assert_eq!(s.take_text(5).unwrap(), "\nx\ny");
        assert!(s.at_end());
    }

    #[test]
    fn test_illegal_character() {
        let err = scan("a\u{1}").char_data().unwrap_err();
        assert_eq!(err.kind, ErrorKind::XmlParsing);
        assert_eq!(err.location.byte_offset, 1);
    }

    #[test]
    fn test_name_keeps_prefix() {
        let mut s = scan("o-ex:rights>");
        assert_eq!(s.name().unwrap(), "o-ex:rights");
        assert_eq!(s.peek(), Some(b'>'));
    }

    #[test]
    fn test_name_rejects_bad_start() {
        assert!(scan("1abc").name().is_err());
        assert!(scan("").name().is_err());
    }

    #[test]
    fn test_name_length_limit() {
        let mut s = Scanner::new("abcdef", DEFAULT_MAX_DEPTH, 3);
        let err = s.name().unwrap_err();
        assert!(err.message.contains("name length"));
    }

    #[test]
    fn test_references() {
        for (src, expected) in [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&quot;", '"'),
            ("&#65;", 'A'),
            ("&#x42;", 'B'),
            ("&#xE9;", '\u{e9}'),
        ] {
            assert_eq!(scan(src).reference().unwrap(), expected, "{src}");
        }
    }

    #[test]
    fn test_bad_references() {
        for src in ["&nbsp;", "&#0;", "&#x;", "&#+65;", "&#xD800;", "&amp"] {
            assert!(scan(src).reference().is_err(), "{src}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut s = Scanner::new("", 1, DEFAULT_MAX_NAME_LENGTH);
        s.enter_element().unwrap();
        assert!(s.enter_element().is_err());
        s.leave_element();
        assert!(s.enter_element().is_ok());
    }

    #[test]
    fn test_attribute_value() {
        assert_eq!(scan("\"a&amp;b\tc\"").attribute_value().unwrap(), "a&b c");
        assert_eq!(scan("'say \"hi\"'").attribute_value().unwrap(), "say \"hi\"");
        assert!(scan("\"a<b\"").attribute_value().is_err());
        assert!(scan("\"open").attribute_value().is_err());
        assert!(scan("bare").attribute_value().is_err());
    }

    #[test]
    fn test_literal_is_not_expanded() {
        let mut s = scan("'-//WAPFORUM//DTD SI 1.0//EN &x;' rest");
        assert_eq!(s.literal().unwrap(), "-//WAPFORUM//DTD SI 1.0//EN &x;");
        assert!(s.starts_with(" rest"));
    }

    #[test]
    fn test_char_data_stops_at_markup() {
        let mut s = scan("BEGIN:VCARD&amp;<x/>");
        assert_eq!(s.char_data().unwrap(), "BEGIN:VCARD");
        assert_eq!(s.peek(), Some(b'&'));
        assert!(scan("a]]>b").char_data().is_err());
    }

    #[test]
    fn test_until_consumes_delimiter() {
        let mut s = scan("x <y> ]]>rest");
        assert_eq!(s.until("]]>", "CDATA section").unwrap(), "x <y> ");
        assert!(s.starts_with("rest"));
        let err = scan("never closed").until("-->", "comment").unwrap_err();
        assert!(err.message.contains("comment"));
    }

    #[test]
    fn test_skip_internal_subset() {
        let mut s = scan("[<!ENTITY a \"]\"> <!-- ] --> [x]]>");
        s.skip_internal_subset().unwrap();
        assert!(s.starts_with(">"));
    }

    #[test]
    fn test_xml_decl() {
        let mut s = scan("<?xml version=\"1.0\" encoding='ISO-8859-1' standalone=\"no\"?>");
        let decl = s.xml_decl().unwrap();
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.encoding, Some("ISO-8859-1"));
        assert_eq!(decl.standalone, Some(false));
        assert!(s.at_end());
    }

    #[test]
    fn test_xml_decl_version_only() {
        let decl = scan("<?xml version='1.1' ?>").xml_decl().unwrap();
        assert_eq!(decl.version, "1.1");
        assert_eq!(decl.encoding, None);
        assert_eq!(decl.standalone, None);
    }

    #[test]
    fn test_xml_decl_rejects_malformed() {
        for src in [
            "<?xml version=\"2.0\"?>",
            "<?xml encoding=\"UTF-8\"?>",
            "<?xml version=\"1.0\" encoding=\"8bit\"?>",
            "<?xml version=\"1.0\" standalone=\"maybe\"?>",
        ] {
            assert!(scan(src).xml_decl().is_err(), "{src}");
        }
    }
}
