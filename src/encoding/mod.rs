//! Input decoding and charset identification.
//!
//! Two jobs live here:
//!
//! 1. [`decode_to_utf8`] turns raw input bytes into UTF-8 text before the
//!    event source sees them (BOM sniffing, then the XML declaration's
//!    `encoding=`), bridging to `encoding_rs` for the
//!    actual transcoding.
//! 2. [`Charset`] maps the charset name from the XML declaration to the
//!    IANA MIBenum the WBXML header carries.

use std::borrow::Cow;
use std::fmt;

use crate::error::{ErrorKind, ParseError, SourceLocation};

/// An IANA character set, identified by its MIBenum.
///
/// Only the charsets a WBXML document can reasonably declare are listed;
/// [`Charset::Unknown`] (MIB 0) is the value a tree starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Charset {
    /// No charset declared or recognised.
    #[default]
    Unknown,
    /// US-ASCII (MIB 3).
    UsAscii,
    /// ISO-8859-1, Latin-1 (MIB 4).
    Iso8859_1,
    /// ISO-8859-2, Latin-2 (MIB 5).
    Iso8859_2,
    /// ISO-8859-3, Latin-3 (MIB 6).
    Iso8859_3,
    /// ISO-8859-4, Latin-4 (MIB 7).
    Iso8859_4,
    /// ISO-8859-5, Cyrillic (MIB 8).
    Iso8859_5,
    /// ISO-8859-6, Arabic (MIB 9).
    Iso8859_6,
    /// ISO-8859-7, Greek (MIB 10).
    Iso8859_7,
    /// ISO-8859-8, Hebrew (MIB 11).
    Iso8859_8,
    /// ISO-8859-9, Latin-5 (MIB 12).
    Iso8859_9,
    /// Shift_JIS (MIB 17).
    ShiftJis,
    /// EUC-JP (MIB 18).
    EucJp,
    /// EUC-KR (MIB 38).
    EucKr,
    /// ISO-2022-JP (MIB 39).
    Iso2022Jp,
    /// UTF-8 (MIB 106).
    Utf8,
    /// GBK (MIB 113).
    Gbk,
    /// GB18030 (MIB 114).
    Gb18030,
    /// ISO-10646-UCS-2 (MIB 1000).
    Ucs2,
    /// UTF-16BE (MIB 1013).
    Utf16Be,
    /// UTF-16LE (MIB 1014).
    Utf16Le,
    /// UTF-16 (MIB 1015).
    Utf16,
    /// UTF-32 (MIB 1017).
    Utf32,
    /// KOI8-R (MIB 2084).
    Koi8R,
    /// Big5 (MIB 2026).
    Big5,
    /// windows-1252 (MIB 2252).
    Windows1252,
}

/// `(charset, preferred IANA name, MIBenum)`.
const CHARSETS: &[(Charset, &str, u32)] = &[
    (Charset::UsAscii, "US-ASCII", 3),
    (Charset::Iso8859_1, "ISO-8859-1", 4),
    (Charset::Iso8859_2, "ISO-8859-2", 5),
    (Charset::Iso8859_3, "ISO-8859-3", 6),
    (Charset::Iso8859_4, "ISO-8859-4", 7),
    (Charset::Iso8859_5, "ISO-8859-5", 8),
    (Charset::Iso8859_6, "ISO-8859-6", 9),
    (Charset::Iso8859_7, "ISO-8859-7", 10),
    (Charset::Iso8859_8, "ISO-8859-8", 11),
    (Charset::Iso8859_9, "ISO-8859-9", 12),
    (Charset::ShiftJis, "Shift_JIS", 17),
    (Charset::EucJp, "EUC-JP", 18),
    (Charset::EucKr, "EUC-KR", 38),
    (Charset::Iso2022Jp, "ISO-2022-JP", 39),
    (Charset::Utf8, "UTF-8", 106),
    (Charset::Gbk, "GBK", 113),
    (Charset::Gb18030, "GB18030", 114),
    (Charset::Ucs2, "ISO-10646-UCS-2", 1000),
    (Charset::Utf16Be, "UTF-16BE", 1013),
    (Charset::Utf16Le, "UTF-16LE", 1014),
    (Charset::Utf16, "UTF-16", 1015),
    (Charset::Utf32, "UTF-32", 1017),
    (Charset::Koi8R, "KOI8-R", 2084),
    (Charset::Big5, "Big5", 2026),
    (Charset::Windows1252, "windows-1252", 2252),
];

/// IANA registered aliases, checked before `encoding_rs` labels. WHATWG
/// folds several of these (`latin1`, `ascii`) into windows-1252, which
/// would give the wrong MIBenum.
const IANA_ALIASES: &[(&str, Charset)] = &[
    ("ANSI_X3.4-1968", Charset::UsAscii),
    ("ASCII", Charset::UsAscii),
    ("US", Charset::UsAscii),
    ("ISO646-US", Charset::UsAscii),
    ("IBM367", Charset::UsAscii),
    ("cp367", Charset::UsAscii),
    ("csASCII", Charset::UsAscii),
    ("ISO_8859-1", Charset::Iso8859_1),
    ("iso-ir-100", Charset::Iso8859_1),
    ("latin1", Charset::Iso8859_1),
    ("l1", Charset::Iso8859_1),
    ("IBM819", Charset::Iso8859_1),
    ("CP819", Charset::Iso8859_1),
    ("csISOLatin1", Charset::Iso8859_1),
    ("ISO_8859-2", Charset::Iso8859_2),
    ("latin2", Charset::Iso8859_2),
    ("l2", Charset::Iso8859_2),
    ("ISO_8859-3", Charset::Iso8859_3),
    ("latin3", Charset::Iso8859_3),
    ("l3", Charset::Iso8859_3),
    ("ISO_8859-4", Charset::Iso8859_4),
    ("latin4", Charset::Iso8859_4),
    ("l4", Charset::Iso8859_4),
    ("ISO_8859-5", Charset::Iso8859_5),
    ("cyrillic", Charset::Iso8859_5),
    ("ISO_8859-6", Charset::Iso8859_6),
    ("arabic", Charset::Iso8859_6),
    ("ISO_8859-7", Charset::Iso8859_7),
    ("greek", Charset::Iso8859_7),
    ("ISO_8859-8", Charset::Iso8859_8),
    ("hebrew", Charset::Iso8859_8),
    ("ISO_8859-9", Charset::Iso8859_9),
    ("latin5", Charset::Iso8859_9),
    ("l5", Charset::Iso8859_9),
    ("MS_Kanji", Charset::ShiftJis),
    ("csShiftJIS", Charset::ShiftJis),
    ("csUnicode", Charset::Ucs2),
];

impl Charset {
    /// Looks up a charset by name.
    ///
    /// IANA preferred names and registered aliases match
    /// case-insensitively. Anything else is resolved as an `encoding_rs`
    /// label, so WHATWG aliases such as `utf8` or `sjis` are accepted too.
    ///
    /// # Examples
    ///
    /// ```
    /// use wbxml_tree::encoding::Charset;
    ///
    /// assert_eq!(Charset::from_name("utf-8"), Some(Charset::Utf8));
    /// assert_eq!(Charset::from_name("ISO-8859-1").map(Charset::mib), Some(4));
    /// assert_eq!(Charset::from_name("klingon"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(&(charset, _, _)) = CHARSETS
            .iter()
            .find(|(_, iana, _)| iana.eq_ignore_ascii_case(name))
        {
            return Some(charset);
        }
        if let Some(&(_, charset)) = IANA_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        {
            return Some(charset);
        }
        let encoding = encoding_rs::Encoding::for_label(name.as_bytes())?;
        CHARSETS
            .iter()
            .find(|(_, iana, _)| iana.eq_ignore_ascii_case(encoding.name()))
            .map(|&(charset, _, _)| charset)
    }

    /// Looks up a charset by MIBenum.
    #[must_use]
    pub fn from_mib(mib: u32) -> Option<Self> {
        if mib == 0 {
            return Some(Self::Unknown);
        }
        CHARSETS
            .iter()
            .find(|&&(_, _, m)| m == mib)
            .map(|&(charset, _, _)| charset)
    }

    /// Returns the IANA MIBenum (0 for [`Charset::Unknown`]).
    #[must_use]
    pub fn mib(self) -> u32 {
        self.entry().map_or(0, |&(_, _, mib)| mib)
    }

    /// Returns the preferred IANA name, or `None` for [`Charset::Unknown`].
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        self.entry().map(|&(_, name, _)| name)
    }

    fn entry(self) -> Option<&'static (Charset, &'static str, u32)> {
        CHARSETS.iter().find(|(c, _, _)| *c == self)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("unknown"))
    }
}

/// Detects the encoding of an XML byte stream by its Byte Order Mark.
///
/// Returns the encoding label and the number of BOM bytes to skip. No BOM
/// means UTF-8, as XML 1.0 section 4.3.3 requires.
///
/// ```
/// use wbxml_tree::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<a/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"<a/>"), ("UTF-8", 0));
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Decodes raw XML bytes to UTF-8.
///
/// UTF-16 input is recognised by its BOM. Otherwise the encoding named in
/// the XML declaration wins when it is an ASCII-compatible charset other
/// than UTF-8, even if the bytes happen to be valid UTF-8. Remaining UTF-8
/// input is borrowed as-is; input that is not valid UTF-8 is transcoded
/// with the declared encoding.
///
/// # Errors
///
/// Returns a [`ParseError`] of kind [`ErrorKind::Encoding`] when the
/// encoding cannot be determined or the bytes are malformed for it.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];

    if bom_encoding == "UTF-8" {
        if let Ok(text) = std::str::from_utf8(content) {
            // Bytes that validate as UTF-8 may still be a single-byte
            // charset the declaration names.
            return match declared_encoding(content).as_deref().and_then(single_byte_override) {
                Some(declared) => transcode(content, declared).map(Cow::Owned),
                None => Ok(Cow::Borrowed(text)),
            };
        }
        // The XML declaration is ASCII-compatible, so it can be read from
        // the raw bytes even when the rest is not UTF-8.
        return match declared_encoding(content) {
            Some(declared) => transcode(content, &declared).map(Cow::Owned),
            None => Err(encoding_error("input is not valid UTF-8")),
        };
    }

    transcode(content, bom_encoding).map(Cow::Owned)
}

/// Returns the declared label when it names an ASCII-compatible encoding
/// other than UTF-8. Unknown labels are left to the tree builder, which
/// reports them.
fn single_byte_override(declared: &str) -> Option<&str> {
    let encoding = encoding_rs::Encoding::for_label(declared.trim().as_bytes())?;
    (encoding != encoding_rs::UTF_8 && encoding.is_ascii_compatible()).then_some(declared)
}

/// Transcodes `bytes` from the named encoding into a UTF-8 `String`.
fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String, ParseError> {
    let encoding = encoding_rs::Encoding::for_label(encoding_name.as_bytes())
        .ok_or_else(|| encoding_error(format!("unsupported encoding: {encoding_name}")))?;

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(encoding_error(format!(
            "malformed byte sequence for encoding {encoding_name}"
        )));
    }
    Ok(text.into_owned())
}

/// Extracts the `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let at = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = trim_ascii_start(&decl[at + needle.len()..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);

    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest.iter().position(|&b| b == quote)?;
    let name = &rest[..end];
    name.is_ascii()
        .then(|| String::from_utf8_lossy(name).into_owned())
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

fn encoding_error(message: impl Into<String>) -> ParseError {
    ParseError::new(ErrorKind::Encoding, message, SourceLocation::default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_charset_iana_names() {
        assert_eq!(Charset::from_name("US-ASCII"), Some(Charset::UsAscii));
        assert_eq!(Charset::from_name("shift_jis"), Some(Charset::ShiftJis));
        assert_eq!(Charset::from_name("ISO-10646-UCS-2"), Some(Charset::Ucs2));
        assert_eq!(Charset::from_name("UTF-16"), Some(Charset::Utf16));
    }

    #[test]
    fn test_charset_alias_through_encoding_rs() {
        assert_eq!(Charset::from_name("utf8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_name("sjis"), Some(Charset::ShiftJis));
        assert_eq!(Charset::from_name("cp1252"), Some(Charset::Windows1252));
    }

    #[test]
    fn test_charset_iana_aliases_win_over_whatwg() {
        assert_eq!(Charset::from_name("latin1").map(Charset::mib), Some(4));
        assert_eq!(Charset::from_name("L1"), Some(Charset::Iso8859_1));
        assert_eq!(Charset::from_name("ascii"), Some(Charset::UsAscii));
        assert_eq!(Charset::from_name("Latin2"), Some(Charset::Iso8859_2));
        assert_eq!(Charset::from_name("greek"), Some(Charset::Iso8859_7));
    }

    #[test]
    fn test_charset_unknown_name() {
        assert_eq!(Charset::from_name("EBCDIC-XYZ"), None);
        assert_eq!(Charset::from_name(""), None);
    }

    #[test]
    fn test_charset_mib_roundtrip() {
        for &(charset, _, mib) in CHARSETS {
            assert_eq!(charset.mib(), mib);
            assert_eq!(Charset::from_mib(mib), Some(charset));
        }
        assert_eq!(Charset::Unknown.mib(), 0);
        assert_eq!(Charset::from_mib(0), Some(Charset::Unknown));
        assert_eq!(Charset::from_mib(9999), None);
    }

    #[test]
    fn test_charset_display() {
        assert_eq!(Charset::Utf8.to_string(), "UTF-8");
        assert_eq!(Charset::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_detect_utf16_boms() {
        assert_eq!(detect_encoding(b"\xFE\xFF\x00<"), ("UTF-16BE", 2));
        assert_eq!(detect_encoding(b"\xFF\xFE<\x00"), ("UTF-16LE", 2));
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
    }

    #[test]
    fn test_decode_utf8_is_borrowed() {
        let decoded = decode_to_utf8(b"<SyncML/>").unwrap();
        assert!(matches!(decoded, Cow::Borrowed("<SyncML/>")));
    }

    #[test]
    fn test_decode_utf8_bom_is_stripped() {
        let decoded = decode_to_utf8(b"\xEF\xBB\xBF<a/>").unwrap();
        assert_eq!(decoded, "<a/>");
    }

    #[test]
    fn test_decode_utf16le() {
        let bytes = b"\xFF\xFE<\x00a\x00/\x00>\x00";
        assert_eq!(decode_to_utf8(bytes).unwrap(), "<a/>");
    }

    #[test]
    fn test_decode_latin1_declared() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xE9</a>";
        let decoded = decode_to_utf8(bytes).unwrap();
        assert!(decoded.ends_with("<a>\u{e9}</a>"));
    }

    #[test]
    fn test_decode_declared_latin1_over_valid_utf8() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xC3\xA9</a>";
        let decoded = decode_to_utf8(bytes).unwrap();
        assert!(decoded.ends_with("<a>\u{c3}\u{a9}</a>"), "{decoded}");
    }

    #[test]
    fn test_decode_declared_utf8_or_unknown_is_borrowed() {
        let utf8 = "<?xml version=\"1.0\" encoding=\"utf-8\"?><a>\u{e9}</a>";
        assert!(matches!(decode_to_utf8(utf8.as_bytes()).unwrap(), Cow::Borrowed(_)));
        let unknown = "<?xml version=\"1.0\" encoding=\"klingon\"?><a/>";
        assert!(matches!(decode_to_utf8(unknown.as_bytes()).unwrap(), Cow::Borrowed(_)));
        // UTF-16 without a BOM cannot describe ASCII-looking bytes.
        let utf16 = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><a/>";
        assert!(matches!(decode_to_utf8(utf16.as_bytes()).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_invalid_utf8_without_declaration() {
        let err = decode_to_utf8(b"<a>\xFF</a>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Encoding);
    }

    #[test]
    fn test_declared_encoding_single_quotes() {
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding='UTF-16'?>"),
            Some("UTF-16".to_string())
        );
        assert_eq!(declared_encoding(b"<?xml version='1.0'?>"), None);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }
}
