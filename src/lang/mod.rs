//! Language tables and their registry.
//!
//! A WBXML encoder needs to know which token tables apply to a document.
//! The document announces its language either through its DOCTYPE (public
//! and system identifiers) or, failing that, implicitly through the name of
//! its root element. [`LanguageRegistry`] answers both questions;
//! [`MainTables`] is the built-in registry.

use std::fmt;

/// Identity of a known XML language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Language {
    /// WAP Wireless Markup Language 1.0.
    Wml10,
    /// WAP Wireless Telephony Application 1.0.
    Wta10,
    /// WAP Wireless Markup Language 1.1.
    Wml11,
    /// WAP Service Indication 1.0.
    Si10,
    /// WAP Service Loading 1.0.
    Sl10,
    /// WAP Cache Operation 1.0.
    Co10,
    /// WTA channel 1.1.
    Channel11,
    /// WAP Wireless Markup Language 1.2.
    Wml12,
    /// WAP Wireless Markup Language 1.3.
    Wml13,
    /// WAP Provisioning 1.0.
    Prov10,
    /// WTA-flavoured WML 1.2.
    WtaWml12,
    /// WTA channel 1.2.
    Channel12,
    /// OMA E-Mail Notification 1.0.
    Emn10,
    /// OMA DRM Rights Expression Language 1.0.
    DrmRel10,
    /// Nokia/Ericsson over-the-air settings.
    OtaSettings,
    /// SyncML representation protocol 1.0.
    SyncMl10,
    /// SyncML device information 1.0.
    DevInf10,
    /// SyncML representation protocol 1.1.
    SyncMl11,
    /// SyncML device information 1.1.
    DevInf11,
    /// SyncML meta information 1.1.
    MetInf11,
    /// OMA DS (SyncML) representation protocol 1.2.
    SyncMl12,
    /// OMA DS device information 1.2.
    DevInf12,
    /// OMA DS meta information 1.2.
    MetInf12,
    /// Microsoft ActiveSync (AirSync).
    AirSync,
    /// Wireless Village client-server protocol 1.1.
    WvCsp11,
    /// A language supplied by a custom [`LanguageRegistry`].
    Other,
}

/// One entry of a language registry.
#[derive(Debug, PartialEq, Eq)]
pub struct LanguageTable {
    /// Which language this is.
    pub language: Language,
    /// The WBXML public identifier written in the binary header
    /// (`0x01` means "unknown, use the string form").
    pub wbxml_public_id: u32,
    /// The XML formal public identifier, if the language has one.
    pub public_id: Option<&'static str>,
    /// The expected root element name.
    pub root: &'static str,
    /// The DTD system identifier, if the language has one.
    pub dtd: Option<&'static str>,
}

impl fmt::Display for LanguageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_id {
            Some(public_id) => f.write_str(public_id),
            None => write!(f, "<{}>", self.root),
        }
    }
}

/// Looks up language tables from document metadata.
///
/// Only [`search`](LanguageRegistry::search) must be implemented. It checks
/// the public identifier first, then the system identifier, then the root
/// element name, and returns the first table that matches.
pub trait LanguageRegistry {
    /// Finds the table matching any of the given identifiers.
    fn search(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
        root: Option<&str>,
    ) -> Option<&'static LanguageTable>;

    /// Finds the table announced by a DOCTYPE declaration.
    fn by_doctype(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Option<&'static LanguageTable> {
        self.search(public_id, system_id, None)
    }

    /// Guesses the table from the root element name.
    fn by_root(&self, root: &str) -> Option<&'static LanguageTable> {
        self.search(None, None, Some(root))
    }
}

/// The built-in registry of WAP, OMA and SyncML languages.
///
/// ```
/// use wbxml_tree::lang::{Language, LanguageRegistry, MainTables};
///
/// let table = MainTables.by_doctype(Some("-//SYNCML//DTD SyncML 1.1//EN"), None).unwrap();
/// assert_eq!(table.language, Language::SyncMl11);
/// assert_eq!(MainTables.by_root("si").map(|t| t.language), Some(Language::Si10));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MainTables;

impl MainTables {
    /// All tables, in search order.
    #[must_use]
    pub fn tables(self) -> &'static [LanguageTable] {
        MAIN_TABLE
    }
}

impl LanguageRegistry for MainTables {
    fn search(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
        root: Option<&str>,
    ) -> Option<&'static LanguageTable> {
        search_table(MAIN_TABLE, public_id, system_id, root)
    }
}

/// Searches `table` in the order public id, system id, root name.
///
/// Identifiers compare ASCII case-insensitively, root names exactly.
#[must_use]
pub fn search_table(
    table: &'static [LanguageTable],
    public_id: Option<&str>,
    system_id: Option<&str>,
    root: Option<&str>,
) -> Option<&'static LanguageTable> {
    if let Some(public_id) = public_id {
        let found = table.iter().find(|entry| {
            entry
                .public_id
                .is_some_and(|p| p.eq_ignore_ascii_case(public_id.trim()))
        });
        if found.is_some() {
            return found;
        }
    }

    if let Some(system_id) = system_id {
        let found = table.iter().find(|entry| {
            entry
                .dtd
                .is_some_and(|d| d.eq_ignore_ascii_case(system_id.trim()))
        });
        if found.is_some() {
            return found;
        }
    }

    let root = root?;
    table.iter().find(|entry| entry.root == root)
}

macro_rules! table {
    ($lang:ident, $id:expr, $public:expr, $root:expr, $dtd:expr) => {
        LanguageTable {
            language: Language::$lang,
            wbxml_public_id: $id,
            public_id: $public,
            root: $root,
            dtd: $dtd,
        }
    };
}

static MAIN_TABLE: &[LanguageTable] = &[
    table!(Wml10, 0x02, Some("-//WAPFORUM//DTD WML 1.0//EN"), "wml", Some("http://www.wapforum.org/DTD/wml.xml")),
    table!(Wta10, 0x03, Some("-//WAPFORUM//DTD WTA 1.0//EN"), "wtai", Some("http://www.wapforum.org/DTD/wta.xml")),
    table!(Wml11, 0x04, Some("-//WAPFORUM//DTD WML 1.1//EN"), "wml", Some("http://www.wapforum.org/DTD/wml_1.1.xml")),
    table!(Si10, 0x05, Some("-//WAPFORUM//DTD SI 1.0//EN"), "si", Some("http://www.wapforum.org/DTD/si.dtd")),
    table!(Sl10, 0x06, Some("-//WAPFORUM//DTD SL 1.0//EN"), "sl", Some("http://www.wapforum.org/DTD/sl.dtd")),
    table!(Co10, 0x07, Some("-//WAPFORUM//DTD CO 1.0//EN"), "co", Some("http://www.wapforum.org/DTD/co_1.0.dtd")),
    table!(Channel11, 0x08, Some("-//WAPFORUM//DTD CHANNEL 1.1//EN"), "channel", Some("http://www.wapforum.org/DTD/channel11.dtd")),
    table!(Wml12, 0x09, Some("-//WAPFORUM//DTD WML 1.2//EN"), "wml", Some("http://www.wapforum.org/DTD/wml12.dtd")),
    table!(Wml13, 0x0A, Some("-//WAPFORUM//DTD WML 1.3//EN"), "wml", Some("http://www.wapforum.org/DTD/wml13.dtd")),
    table!(Prov10, 0x0B, Some("-//WAPFORUM//DTD PROV 1.0//EN"), "wap-provisioningdoc", Some("http://www.wapforum.org/DTD/prov.dtd")),
    table!(WtaWml12, 0x0C, Some("-//WAPFORUM//DTD WTA-WML 1.2//EN"), "wta-wml", Some("http://www.wapforum.org/DTD/wta-wml12.dtd")),
    table!(Channel12, 0x0D, Some("-//WAPFORUM//DTD CHANNEL 1.2//EN"), "channel", Some("http://www.wapforum.org/DTD/channel12.dtd")),
    table!(Emn10, 0x0D, Some("-//OMA//DTD EMN 1.0//EN"), "emn", Some("http://www.openmobilealliance.org/tech/DTD/emn.dtd")),
    table!(DrmRel10, 0x0E, Some("-//OMA//DTD DRMREL 1.0//EN"), "o-ex:rights", Some("http://www.openmobilealliance.org/DTD/drmrel10.dtd")),
    table!(OtaSettings, 0x01, None, "CHARACTERISTIC-LIST", None),
    table!(SyncMl10, 0x0FD1, Some("-//SYNCML//DTD SyncML 1.0//EN"), "SyncML", Some("http://www.syncml.org/docs/syncml_represent_v10_20001207.dtd")),
    table!(DevInf10, 0x0FD2, Some("-//SYNCML//DTD DevInf 1.0//EN"), "DevInf", Some("http://www.syncml.org/docs/devinf_v10_20001207.dtd")),
    table!(SyncMl11, 0x0FD3, Some("-//SYNCML//DTD SyncML 1.1//EN"), "SyncML", Some("http://www.syncml.org/docs/syncml_represent_v11_20020213.dtd")),
    table!(DevInf11, 0x0FD4, Some("-//SYNCML//DTD DevInf 1.1//EN"), "DevInf", Some("http://www.syncml.org/docs/devinf_v11_20020215.dtd")),
    table!(MetInf11, 0x0FD5, Some("-//SYNCML//DTD MetInf 1.1//EN"), "MetInf", Some("http://www.syncml.org/docs/syncml_metinf_v11_20020215.dtd")),
    table!(SyncMl12, 0x1201, Some("-//SYNCML//DTD SyncML 1.2//EN"), "SyncML", Some("http://www.openmobilealliance.org/tech/DTD/OMA-TS-SyncML_RepPro_DTD-V1_2.dtd")),
    table!(DevInf12, 0x1203, Some("-//SYNCML//DTD DevInf 1.2//EN"), "DevInf", Some("http://www.openmobilealliance.org/tech/DTD/OMA-TS-DevInf_DTD-V1_2.dtd")),
    table!(MetInf12, 0x1202, Some("-//SYNCML//DTD MetInf 1.2//EN"), "MetInf", Some("http://www.openmobilealliance.org/tech/DTD/OMA-TS-SyncML_MetaInfo_DTD-V1_2.dtd")),
    table!(AirSync, 0x01, Some("-//AIRSYNC//DTD AirSync//EN"), "AirSync", Some("http://www.microsoft.com/")),
    table!(WvCsp11, 0x10, Some("-//OMA//DTD WV-CSP 1.1//EN"), "WV-CSP-Message", Some("http://www.openmobilealliance.org/DTD/WV-CSP.DTD")),
];
