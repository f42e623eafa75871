//! Integration tests building trees from real-world WAP and SyncML messages.
//!
//! Each document is also serialized and rebuilt, and the second
//! serialization must match the first.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use wbxml_tree::encoding::Charset;
use wbxml_tree::lang::Language;
use wbxml_tree::parser::{parse_bytes, parse_bytes_with_options, ParseOptions};
use wbxml_tree::serial::serialize;
use wbxml_tree::tree::NodeKind;
use wbxml_tree::{ErrorKind, NodeId, Tree};

fn build_and_roundtrip(input: &str) -> Tree {
    let tree = parse_bytes(input.as_bytes()).unwrap_or_else(|e| panic!("build failed: {e}"));
    let output = serialize(&tree);
    let again =
        parse_bytes(output.as_bytes()).unwrap_or_else(|e| panic!("rebuild failed: {e}\n{output}"));
    assert_eq!(serialize(&again), output, "serialization not stable");
    tree
}

fn find(tree: &Tree, name: &str) -> NodeId {
    let root = tree.root().unwrap();
    std::iter::once(root)
        .chain(tree.descendants(root))
        .find(|&n| tree.node_name(n) == Some(name))
        .unwrap_or_else(|| panic!("no <{name}>"))
}

fn element_children(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    tree.children(node)
        .filter(|&c| !matches!(tree.node(c).kind, NodeKind::Text { .. }))
        .collect()
}

// --- WAP ---

#[test]
fn test_service_indication() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE si PUBLIC "-//WAPFORUM//DTD SI 1.0//EN" "http://www.wapforum.org/DTD/si.dtd">
<si>
  <indication href="http://www.xyz.com/email/123/abc.wml" created="1999-06-25T15:23:15Z" si-expires="1999-06-30T00:00:00Z">
    You have 4 new emails
  </indication>
</si>"#;

    let tree = build_and_roundtrip(xml);
    assert_eq!(tree.lang.map(|l| l.language), Some(Language::Si10));
    assert_eq!(tree.charset, Charset::Utf8);
    let indication = find(&tree, "indication");
    assert_eq!(
        tree.attribute(indication, "href"),
        Some("http://www.xyz.com/email/123/abc.wml")
    );
    assert_eq!(
        tree.text_content(indication).trim(),
        "You have 4 new emails"
    );
}

#[test]
fn test_wml_deck_by_system_id() {
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE wml SYSTEM "http://www.wapforum.org/DTD/wml_1.1.xml">
<wml>
  <card id="main" title="Hello">
    <p>Hello &amp; welcome<br/>to WAP</p>
  </card>
</wml>"#;

    let tree = build_and_roundtrip(xml);
    assert_eq!(tree.lang.map(|l| l.language), Some(Language::Wml11));
    let p = find(&tree, "p");
    assert_eq!(tree.text_content(p), "Hello & welcometo WAP");
}

#[test]
fn test_service_loading_by_root_name() {
    let tree = build_and_roundtrip(r#"<sl href="http://www.example.com/ppaid/123/abc.wml"/>"#);
    assert_eq!(tree.lang.map(|l| l.language), Some(Language::Sl10));
    assert!(tree.diagnostics.is_empty());
}

#[test]
fn test_unknown_document() {
    let err = parse_bytes(b"<html><body/></html>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownLanguage);
}

#[test]
fn test_latin1_document() {
    let mut xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><si><indication>Caf".to_vec();
    xml.push(0xE9);
    xml.extend_from_slice(b" ouvert</indication></si>");
    let tree = parse_bytes(&xml).unwrap();
    assert_eq!(tree.charset, Charset::Iso8859_1);
    assert_eq!(tree.text_content(tree.root().unwrap()), "Caf\u{e9} ouvert");

    let output = serialize(&tree);
    assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    let again = parse_bytes(output.as_bytes()).unwrap();
    assert_eq!(again.charset, Charset::Utf8);
    assert_eq!(again.text_content(again.root().unwrap()), "Caf\u{e9} ouvert");
}

#[test]
fn test_latin1_document_that_looks_like_utf8() {
    // C3 A9 is "é" in UTF-8 but two characters in ISO-8859-1.
    let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><si>\xC3\xA9</si>";
    let tree = parse_bytes(xml).unwrap();
    assert_eq!(tree.charset, Charset::Iso8859_1);
    assert_eq!(tree.text_content(tree.root().unwrap()), "\u{c3}\u{a9}");
}

#[test]
fn test_utf16_document() {
    let text = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><si><indication>\u{263A}</indication></si>";
    let mut xml = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        xml.extend_from_slice(&unit.to_le_bytes());
    }
    let tree = parse_bytes(&xml).unwrap();
    assert_eq!(tree.charset, Charset::Utf16);
    assert_eq!(tree.text_content(tree.root().unwrap()), "\u{263A}");
}

#[test]
fn test_malformed_document() {
    let err = parse_bytes(b"<si><indication></si>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::XmlParsing);
    assert!(err.location.line >= 1);
}

// --- SyncML ---

const SYNCML_ADD_VCARD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE SyncML PUBLIC "-//SYNCML//DTD SyncML 1.1//EN" "http://www.syncml.org/docs/syncml_represent_v11_20020213.dtd">
<SyncML xmlns="SYNCML:SYNCML1.1">
  <SyncHdr>
    <VerDTD>1.1</VerDTD>
    <VerProto>SyncML/1.1</VerProto>
    <SessionID>1</SessionID>
    <MsgID>2</MsgID>
    <Target><LocURI>http://sync.example.com</LocURI></Target>
    <Source><LocURI>IMEI:493005100592800</LocURI></Source>
  </SyncHdr>
  <SyncBody>
    <Sync>
      <CmdID>5</CmdID>
      <Target><LocURI>./contacts</LocURI></Target>
      <Source><LocURI>./addressbook</LocURI></Source>
      <Add>
        <CmdID>6</CmdID>
        <Meta><Type xmlns='syncml:metinf'>text/x-vcard</Type></Meta>
        <Item>
          <Source><LocURI>pas-id-3F4B790300000000</LocURI></Source>
          <Data>BEGIN:VCARD
VERSION:2.1
N:Doe;John
TEL;WORK;VOICE:(617) 236-0442
END:VCARD</Data>
        </Item>
      </Add>
    </Sync>
    <Final/>
  </SyncBody>
</SyncML>"#;

#[test]
fn test_syncml_vcard_payload_is_recovered() {
    let tree = build_and_roundtrip(SYNCML_ADD_VCARD);
    assert_eq!(tree.lang.map(|l| l.language), Some(Language::SyncMl11));

    let data = find(&tree, "Data");
    let children: Vec<NodeId> = tree.children(data).collect();
    assert_eq!(children.len(), 1);
    assert!(tree.is_cdata(children[0]));
    let payload = tree.text_content(children[0]);
    assert!(payload.starts_with("BEGIN:VCARD\nVERSION:2.1"));
    assert!(payload.ends_with("END:VCARD"));

    // The cursor came back out of the synthesized CDATA.
    let item = tree.parent(data).unwrap();
    let names: Vec<_> = element_children(&tree, item)
        .into_iter()
        .map(|c| tree.node_name(c).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Source", "Data"]);
    let final_node = find(&tree, "Final");
    assert_eq!(
        tree.node_name(tree.parent(final_node).unwrap()),
        Some("SyncBody")
    );
}

#[test]
fn test_syncml_without_cdata_recovery() {
    let options = ParseOptions::default().recover_cdata(false);
    let tree = parse_bytes_with_options(SYNCML_ADD_VCARD.as_bytes(), &options).unwrap();
    let data = find(&tree, "Data");
    assert!(tree.children(data).all(|c| !tree.is_cdata(c)));
    assert!(tree.text_content(data).starts_with("BEGIN:VCARD"));
}

#[test]
fn test_syncml_put_devinf_is_embedded() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE SyncML PUBLIC "-//SYNCML//DTD SyncML 1.2//EN" "http://www.openmobilealliance.org/tech/DTD/OMA-TS-SyncML_RepPro_DTD-V1_2.dtd">
<SyncML xmlns="SYNCML:SYNCML1.2">
  <SyncHdr>
    <VerDTD>1.2</VerDTD>
    <VerProto>SyncML/1.2</VerProto>
    <SessionID>1</SessionID>
    <MsgID>1</MsgID>
  </SyncHdr>
  <SyncBody>
    <Put>
      <CmdID>1</CmdID>
      <Meta><Type xmlns="syncml:metinf">application/vnd.syncml-devinf+xml</Type></Meta>
      <Item>
        <Source><LocURI>./devinf12</LocURI></Source>
        <Data>
          <DevInf xmlns="syncml:devinf">
            <VerDTD>1.2</VerDTD>
            <Man>Acme</Man>
            <Mod>Phone 3000</Mod>
            <DevID>IMEI:493005100592800</DevID>
            <DevTyp>phone</DevTyp>
            <DataStore>
              <SourceRef>./contacts</SourceRef>
              <Rx-Pref><CTType>text/x-vcard</CTType><VerCT>2.1</VerCT></Rx-Pref>
            </DataStore>
          </DevInf>
        </Data>
      </Item>
    </Put>
    <Final/>
  </SyncBody>
</SyncML>"#;

    let tree = build_and_roundtrip(xml);
    assert_eq!(tree.lang.map(|l| l.language), Some(Language::SyncMl12));

    let data = find(&tree, "Data");
    let embedded_nodes: Vec<NodeId> = tree
        .children(data)
        .filter(|&c| tree.embedded(c).is_some())
        .collect();
    assert_eq!(embedded_nodes.len(), 1);

    let devinf = tree.embedded(embedded_nodes[0]).unwrap();
    let root = devinf.root().unwrap();
    assert_eq!(devinf.node_name(root), Some("DevInf"));
    assert_eq!(devinf.attribute(root, "xmlns"), Some("syncml:devinf"));
    assert_eq!(devinf.text_content(find(devinf, "Man")), "Acme");
    assert_eq!(devinf.text_content(find(devinf, "CTType")), "text/x-vcard");

    // Nothing of the DevInf document leaks into the outer tree.
    let outer_root = tree.root().unwrap();
    assert!(tree
        .descendants(outer_root)
        .all(|n| tree.node_name(n) != Some("Man")));
}

#[test]
fn test_syncml_devinf_elision_disabled() {
    let xml = "<SyncML><SyncBody><Results><Item><Data><DevInf><Man>Acme</Man></DevInf></Data></Item></Results></SyncBody></SyncML>";
    let options = ParseOptions::default().elidable_tags(Vec::<String>::new());
    let tree = parse_bytes_with_options(xml.as_bytes(), &options).unwrap();
    let man = find(&tree, "Man");
    assert_eq!(tree.text_content(man), "Acme");
    assert!(tree.descendants(tree.root().unwrap()).all(|n| tree.embedded(n).is_none()));
}

#[test]
fn test_syncml_replace_vobject_payloads() {
    let xml = "<SyncML><SyncBody><Replace><CmdID>3</CmdID>\
               <Item><Data>BEGIN:VCALENDAR\nEND:VCALENDAR</Data></Item>\
               <Item><Data><![CDATA[BEGIN:VNOTE]]></Data></Item>\
               </Replace></SyncBody></SyncML>";
    let tree = build_and_roundtrip(xml);
    let root = tree.root().unwrap();
    let datas: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&n| tree.node_name(n) == Some("Data"))
        .collect();
    assert_eq!(datas.len(), 2);
    for data in datas {
        let children: Vec<NodeId> = tree.children(data).collect();
        assert_eq!(children.len(), 1, "{}", tree.text_content(data));
        assert!(tree.is_cdata(children[0]));
    }
}

#[test]
fn test_recovered_cdata_keeps_nested_element() {
    let xml = "<SyncML><Add><Item><Data>x<b/>y</Data></Item></Add></SyncML>";
    let tree = build_and_roundtrip(xml);
    let output = serialize(&tree);
    assert!(
        output.contains("<Data><![CDATA[x]]><b/><![CDATA[y]]></Data>"),
        "{output}"
    );
    let again = parse_bytes(output.as_bytes()).unwrap();
    find(&again, "b");
    assert_eq!(again.text_content(find(&again, "Data")), "xy");
}

#[test]
fn test_recovered_cdata_keeps_embedded_devinf() {
    let xml = "<SyncML><Add><Item><Data>x<DevInf><Man>A</Man></DevInf></Data></Item></Add></SyncML>";
    let tree = build_and_roundtrip(xml);
    let output = serialize(&tree);
    assert!(
        output.contains("<Data><![CDATA[x]]><DevInf><Man>A</Man></DevInf></Data>"),
        "{output}"
    );
    let again = parse_bytes(output.as_bytes()).unwrap();
    let data = find(&again, "Data");
    let devinf = tree_child(&again, data);
    let embedded = again.embedded(devinf).unwrap();
    let man = find(embedded, "Man");
    assert_eq!(embedded.text_content(man), "A");
}

fn tree_child(tree: &Tree, node: NodeId) -> NodeId {
    tree.children(node)
        .find(|&c| tree.embedded(c).is_some())
        .unwrap_or_else(|| panic!("no embedded tree under {:?}", tree.node_name(node)))
}

#[test]
fn test_embedded_error_is_forwarded() {
    // The outer document is fine; only the embedded one has no language.
    let xml = "<SyncML><Ext><XNam>x-acme</XNam></Ext></SyncML>";
    let options = ParseOptions::default().elidable_tags(["Ext"]);
    let err = parse_bytes_with_options(xml.as_bytes(), &options).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownLanguage);
    assert!(err.message.contains("<Ext>"));
}
