//! Line index and token-at-position tests.

use super::*;
use crate::host::MemoryFileSystem;

#[test]
fn test_line_index_roundtrip() {
    let text = "one\ntwo\nthree";
    let idx = LineIndex::new(text);
    assert_eq!(idx.line_count(), 3);

    assert_eq!(idx.position(0), Position { line: 0, character: 0 });
    assert_eq!(idx.position(4), Position { line: 1, character: 0 });
    assert_eq!(idx.position(6), Position { line: 1, character: 2 });
    assert_eq!(idx.position(text.len()), Position { line: 2, character: 5 });

    assert_eq!(idx.offset(Position { line: 1, character: 2 }), 6);
    assert_eq!(idx.offset(Position { line: 0, character: 0 }), 0);
}

#[test]
fn test_line_index_clamps() {
    let idx = LineIndex::new("ab\ncd");
    // column past line end clamps to the newline
    assert_eq!(idx.offset(Position { line: 0, character: 99 }), 2);
    // line past end clamps into the last line
    assert_eq!(idx.offset(Position { line: 9, character: 1 }), 4);
    // offset past end clamps
    assert_eq!(idx.position(999), Position { line: 1, character: 2 });
}

#[test]
fn test_token_tag_name() {
    let doc = Document::new("t.xml", r#"<Skin><Button style="a"/></Skin>"#, 1);
    let offset = doc.text.find("Button").unwrap() + 3;
    match doc.token_at(offset) {
        TokenAt::TagName { tag, .. } => assert_eq!(tag, "Button"),
        other => panic!("expected TagName, got {:?}", other),
    }
}

#[test]
fn test_token_attribute_name() {
    let doc = Document::new("t.xml", r##"<Button style="a" color="#fff"/>"##, 1);
    let offset = doc.text.find("color").unwrap() + 2;
    match doc.token_at(offset) {
        TokenAt::AttributeName { tag, idx, attrs, before_cursor } => {
            assert_eq!(tag, "Button");
            assert_eq!(idx, 1);
            assert_eq!(attrs.len(), 2);
            assert_eq!(before_cursor, "co");
        }
        other => panic!("expected AttributeName, got {:?}", other),
    }
}

#[test]
fn test_token_attribute_value() {
    let doc = Document::new("t.xml", r#"<Button style="Big Small"/>"#, 1);
    let offset = doc.text.find("Small").unwrap() + 2;
    match doc.token_at(offset) {
        TokenAt::AttributeValue { tag, idx, before_cursor, .. } => {
            assert_eq!(tag, "Button");
            assert_eq!(idx, 0);
            assert_eq!(before_cursor, "Big Sm");
        }
        other => panic!("expected AttributeValue, got {:?}", other),
    }
}

#[test]
fn test_token_empty_value_start() {
    let text = r#"<Button style=""/>"#;
    let doc = Document::new("t.xml", text, 1);
    let offset = text.find("\"\"").unwrap() + 1;
    match doc.token_at(offset) {
        TokenAt::AttributeValue { before_cursor, .. } => assert_eq!(before_cursor, ""),
        other => panic!("expected AttributeValue, got {:?}", other),
    }
}

#[test]
fn test_token_outside_tag_invalid() {
    let doc = Document::new("t.xml", "<a>text here</a>", 1);
    let offset = doc.text.find("here").unwrap();
    assert_eq!(doc.token_at(offset), TokenAt::Invalid);
}

#[test]
fn test_token_in_half_typed_tag() {
    let text = "<Skin>\n  <Butt";
    let doc = Document::new("t.xml", text, 1);
    match doc.token_at(text.len()) {
        TokenAt::TagName { tag, .. } => assert_eq!(tag, "Butt"),
        other => panic!("expected TagName, got {:?}", other),
    }
}

#[test]
fn test_token_right_after_angle_bracket() {
    let text = "<Skin>\n  <";
    let doc = Document::new("t.xml", text, 1);
    match doc.token_at(text.len()) {
        TokenAt::TagName { tag, .. } => assert_eq!(tag, ""),
        other => panic!("expected empty TagName, got {:?}", other),
    }
}

#[test]
fn test_token_between_attributes() {
    let text = r#"<Button style="a" />"#;
    let doc = Document::new("t.xml", text, 1);
    let offset = text.find("/>").unwrap() - 1;
    match doc.token_at(offset) {
        TokenAt::AttributeName { idx, before_cursor, .. } => {
            assert_eq!(idx, 1);
            assert_eq!(before_cursor, "");
        }
        other => panic!("expected AttributeName, got {:?}", other),
    }
}

#[test]
fn test_store_open_update_close() {
    let mut store = DocumentStore::new();
    store.open("a.xml", "<Skin/>");
    let v1 = store.version("a.xml").unwrap();
    store.update("a.xml", "<Skin></Skin>");
    let v2 = store.version("a.xml").unwrap();
    assert!(v2 > v1);
    assert!(store.is_open("a.xml"));
    store.close("a.xml");
    assert!(store.get("a.xml").is_none());
}

#[test]
fn test_store_loads_from_fs() {
    let mut fs = MemoryFileSystem::new();
    fs.insert("/pack/skin.xml", "<Skin/>");
    let mut store = DocumentStore::new();
    let doc = store.get_or_load("/pack/skin.xml", &fs).unwrap();
    assert_eq!(doc.dom.root_element().map(|r| doc.dom.node(r).name.clone()), Some("Skin".into()));
    assert!(store.get_or_load("/missing.xml", &fs).is_none());
}

#[test]
fn test_store_invalidate_respects_open() {
    let mut fs = MemoryFileSystem::new();
    fs.insert("/pack/skin.xml", "<Skin/>");
    let mut store = DocumentStore::new();
    store.get_or_load("/pack/skin.xml", &fs);
    store.invalidate("/pack/skin.xml");
    assert!(store.get("/pack/skin.xml").is_none());

    store.open("/pack/skin.xml", "<Skin></Skin>");
    store.invalidate("/pack/skin.xml");
    assert!(store.get("/pack/skin.xml").is_some());
}
