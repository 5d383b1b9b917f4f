//! DOM builder tests: structure, ranges, recovery.

use super::*;

fn parse(src: &str) -> XmlDocument {
    parse_document(src)
}

#[test]
fn test_simple_document() {
    let src = r##"<Skin><Styles><Style name="Primary" color="#fff"/></Styles></Skin>"##;
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert_eq!(doc.node(root).name, "Skin");

    let styles = doc.find_child(root, "Styles").unwrap();
    let style = doc.find_child(styles, "Style").unwrap();
    assert_eq!(doc.node(style).attr_value("name"), Some("Primary"));
    assert!(doc.node(style).self_closing);
    assert!(doc.node(style).closed);
}

#[test]
fn test_ranges_cover_subtree() {
    let src = "<Skin>\n  <Form name=\"F\">\n    <View name=\"V\"/>\n  </Form>\n</Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert_eq!(doc.node(root).range, TextRange::new(0, src.len()));

    let form = doc.find_child(root, "Form").unwrap();
    let form_src = &src[doc.node(form).range.start..doc.node(form).range.end];
    assert!(form_src.starts_with("<Form"));
    assert!(form_src.ends_with("</Form>"));

    let open = &src[doc.node(form).open_range.start..doc.node(form).open_range.end];
    assert_eq!(open, "<Form name=\"F\">");
}

#[test]
fn test_attr_positions_point_into_source() {
    let src = r#"<View name="Row" style="Big Small"/>"#;
    let doc = parse(src);
    let view = doc.root_element().unwrap();
    let style = doc.node(view).attr("style").unwrap();
    assert_eq!(&src[style.value_range.start..style.value_range.end], "Big Small");
    assert_eq!(&src[style.name_range.start..style.name_range.end], "style");
}

#[test]
fn test_unclosed_tag_recovered_at_parent_close() {
    let src = "<Skin>\n  <Variant>\n</Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert_eq!(doc.node(root).name, "Skin");
    assert!(doc.node(root).closed);

    let variant = doc.find_child(root, "Variant").unwrap();
    assert!(!doc.node(variant).closed);
}

#[test]
fn test_unclosed_at_eof() {
    let src = "<Skin><Form name=\"F\">";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert!(!doc.node(root).closed);
    assert_eq!(doc.node(root).range.end, src.len());
    let form = doc.find_child(root, "Form").unwrap();
    assert!(!doc.node(form).closed);
}

#[test]
fn test_dangling_close_ignored_in_dom() {
    let src = "<Skin></Bogus></Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert_eq!(doc.node(root).name, "Skin");
    assert!(doc.node(root).closed);
}

#[test]
fn test_processing_instruction_node() {
    let src = "<Skin><?platform mac win?><Form name=\"F\"/><?platform?></Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    let children: Vec<_> = doc.node(root).children.iter().map(|&c| doc.node(c)).collect();
    assert_eq!(children.len(), 3);
    assert!(children[0].is_pi());
    assert_eq!(children[0].name, "platform");
    assert_eq!(children[0].text, "mac win");
    assert!(children[2].is_pi());
    assert_eq!(children[2].text, "");
}

#[test]
fn test_preceding_siblings_nearest_first() {
    let src = r#"<Skin><a/><b/><c/><d/></Skin>"#;
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    let d = doc.find_child(root, "d").unwrap();
    let names: Vec<_> = doc
        .preceding_siblings(d)
        .into_iter()
        .map(|id| doc.node(id).name.clone())
        .collect();
    assert_eq!(names, vec!["c", "b", "a"]);
}

#[test]
fn test_ancestors() {
    let src = r#"<Skin><Form name="F"><define a="1"/><View name="V"/></Form></Skin>"#;
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    let form = doc.find_child(root, "Form").unwrap();
    let view = doc.find_child(form, "View").unwrap();
    let chain: Vec<_> = doc.ancestors(view).map(|id| doc.node(id).name.clone()).collect();
    assert_eq!(chain, vec!["Form", "Skin"]);
}

#[test]
fn test_node_at_offset() {
    let src = r#"<Skin><Form name="F"><View name="V"/></Form></Skin>"#;
    let doc = parse(src);
    let view_open = src.find("<View").unwrap();
    let id = doc.node_at_offset(view_open + 2).unwrap();
    assert_eq!(doc.node(id).name, "View");

    let form_inner = src.find("<View").unwrap() - 1;
    let id = doc.node_at_offset(form_inner).unwrap();
    assert_eq!(doc.node(id).name, "Form");
}

#[test]
fn test_find_child_with_attr() {
    let src = r#"<Skin><Form name="A"/><Form name="B"/></Skin>"#;
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    let b = doc.find_child_with_attr(root, "Form", "name", "B").unwrap();
    assert_eq!(doc.node(b).attr_value("name"), Some("B"));
    assert!(doc.find_child_with_attr(root, "Form", "name", "C").is_none());
}

#[test]
fn test_mismatched_close_pops_to_match() {
    // </Skin> closes Skin even though Styles was still open
    let src = "<Skin><Styles><Style name=\"a\"/></Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    assert!(doc.node(root).closed);
    let styles = doc.find_child(root, "Styles").unwrap();
    assert!(!doc.node(styles).closed);
    // the style is still a child of Styles
    assert!(doc.find_child(styles, "Style").is_some());
}

#[test]
fn test_element_with_open_tag_at() {
    let src = r#"<Skin><View name="V"/></Skin>"#;
    let doc = parse(src);
    let inside_view_tag = src.find("name").unwrap();
    let id = doc.element_with_open_tag_at(inside_view_tag).unwrap();
    assert_eq!(doc.node(id).name, "View");
}

#[test]
fn test_comment_skipped_by_child_elements() {
    let src = "<Skin><!-- note --><Form name=\"F\"/></Skin>";
    let doc = parse(src);
    let root = doc.root_element().unwrap();
    let elems: Vec<_> = doc.child_elements(root).collect();
    assert_eq!(elems.len(), 1);
    assert_eq!(doc.node(elems[0]).name, "Form");
}
