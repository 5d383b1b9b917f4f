//! IntelliSense tests: completion, hover, definitions, references, rename.

use super::*;
use crate::testutil::analyzer_with;

const ROOT: &str = "/repo/skins/main/skin.xml";

fn offset_in(src: &str, marker: &str, delta: usize) -> usize {
    src.find(marker).expect("marker present") + delta
}

const STYLES_SRC: &str = r##"<Skin>
  <Styles>
    <Style name="My.primary" color="#111"/>
    <Style name="My.secondary" color="#222"/>
  </Styles>
  <Form name="Host">
    <View style="My.primary"/>
  </Form>
</Skin>"##;

#[test]
fn test_completion_styles_for_style_attribute() {
    let mut analyzer = analyzer_with(&[(ROOT, STYLES_SRC)]);
    let offset = offset_in(STYLES_SRC, "style=\"My.primary\"", "style=\"My.".len());
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"My.primary"));
    assert!(labels.contains(&"My.secondary"));
    let primary = items.iter().find(|i| i.label == "My.primary").unwrap();
    assert_eq!(primary.kind, CompletionKind::Module);
}

#[test]
fn test_completion_autoclose_snippet() {
    let src = "<Skin>\n  <Variant>\n  <";
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let items = analyzer.find_completions(ROOT, src.len());
    let snippet = items
        .iter()
        .find(|i| i.kind == CompletionKind::Snippet)
        .expect("closing snippet offered");
    assert_eq!(snippet.label, "/Variant>");
    assert!(snippet.preselect);
}

#[test]
fn test_completion_tag_names_filtered_by_scope() {
    let src = "<Skin>\n  <Form name=\"F\">\n    <Sli\n  </Form>\n</Skin>";
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "<Sli", 4);
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"Slider"));
    // Styles only fits the skin root, not a Form body
    assert!(!labels.contains(&"Styles"));
}

#[test]
fn test_completion_processing_instructions() {
    let src = "<Skin>\n  <?pla\n</Skin>";
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "<?pla", 5);
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["platform"]);
}

#[test]
fn test_completion_attribute_names_substring_filter() {
    let src = r#"<Skin><Form name="F"><View heig /></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "heig", 4);
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"height"));
    assert!(!labels.contains(&"width"));

    // substring, not prefix: "idth" still finds width
    let src2 = r#"<Skin><Form name="F"><View idth /></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src2)]);
    let offset = offset_in(src2, "idth", 4);
    let items = analyzer.find_completions(ROOT, offset);
    assert!(items.iter().any(|i| i.label == "width"));
}

#[test]
fn test_completion_bool_and_enum_values() {
    let src = r#"<Skin><Form name="F"><View visible="" align="left "/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);

    let offset = offset_in(src, "visible=\"", "visible=\"".len());
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"true"));
    assert!(labels.contains(&"false"));

    // enum completion skips entries already present in the value
    let offset = offset_in(src, "align=\"left ", "align=\"left ".len());
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"center"));
    assert!(labels.contains(&"right"));
    assert!(!labels.contains(&"left"));
}

#[test]
fn test_completion_variables_and_theme_metrics() {
    let src = r#"<Skin><Form name="F"><define row.height="20"/><View height="$row"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "height=\"$row", "height=\"$row".len());
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"row.height"));

    // `$` alone also offers the theme tree
    let offset = offset_in(src, "height=\"$row", "height=\"$".len());
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"Theme.padding"));
}

#[test]
fn test_completion_define_markers() {
    let src = r#"<Skin><Form name="F"><define h=""/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "h=\"", 3);
    let items = analyzer.find_completions(ROOT, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"@eval:"));
    assert!(labels.contains(&"@select:"));
    assert!(labels.contains(&"@property:"));
}

#[test]
fn test_completion_uri_listing_and_packs() {
    let src = r#"<Skin><Import url=""/><Resources><Image name="i" url="img/"/></Resources></Skin>"#;
    let mut analyzer = analyzer_with(&[
        (ROOT, src),
        ("/repo/skins/main/img/icon.png", "png"),
        ("/repo/skins/base/skin.xml", "<Skin/>"),
    ]);

    let offset = offset_in(src, "Import url=\"", "Import url=\"".len());
    let items = analyzer.find_completions(ROOT, offset);
    assert!(items.iter().any(|i| i.label == "@base"));

    let offset = offset_in(src, "url=\"img/", "url=\"img/".len());
    let items = analyzer.find_completions(ROOT, offset);
    assert!(items.iter().any(|i| i.label == "icon.png" && i.kind == CompletionKind::File));
}

#[test]
fn test_goto_definition_style() {
    let mut analyzer = analyzer_with(&[(ROOT, STYLES_SRC)]);
    let offset = offset_in(STYLES_SRC, "style=\"My.primary\"", "style=\"My.pri".len());
    let defs = analyzer.find_definitions(ROOT, offset);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].uri, ROOT);
    let def_start = offset_in(STYLES_SRC, "<Style name=\"My.primary\"", 0);
    assert_eq!(defs[0].range.start, def_start);
}

#[test]
fn test_goto_definition_variable() {
    let src = r#"<Skin><Form name="F"><define row.height="20"/><View height="$row.height"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "\"$row.height\"", 4);
    let defs = analyzer.find_definitions(ROOT, offset);
    assert_eq!(defs.len(), 1);
    let name_at = offset_in(src, "row.height=\"20\"", 0);
    assert_eq!(defs[0].range.start, name_at);
}

#[test]
fn test_goto_definition_uri() {
    let src = r#"<Skin><Resources><Image name="i" url="img/icon.png"/></Resources></Skin>"#;
    let mut analyzer = analyzer_with(&[
        (ROOT, src),
        ("/repo/skins/main/img/icon.png", "png"),
    ]);
    let offset = offset_in(src, "img/icon.png", 3);
    let defs = analyzer.find_definitions(ROOT, offset);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].uri, "/repo/skins/main/img/icon.png");
}

#[test]
fn test_goto_definition_define_attr_is_self() {
    let src = r#"<Skin><Form name="F"><define row.height="20"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "row.height=", 3);
    let defs = analyzer.find_definitions(ROOT, offset);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].uri, ROOT);
}

#[test]
fn test_hover_element_and_attribute() {
    let src = r#"<Skin><Form name="F"><View height="10"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);

    let offset = offset_in(src, "<View", 2);
    let hover = analyzer.find_hover(ROOT, offset).expect("element hover");
    assert!(hover.contents.contains("**View**"));
    assert!(hover.contents.contains("A rectangular view."));

    let offset = offset_in(src, "height=", 2);
    let hover = analyzer.find_hover(ROOT, offset).expect("attribute hover");
    assert!(hover.contents.contains("**height**"));
    assert!(hover.contents.contains("float"));
}

#[test]
fn test_hover_variable_shows_expansions() {
    let src = r#"<Skin><Form name="F"><define h="20"/><View height="$h"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "\"$h\"", 2);
    let hover = analyzer.find_hover(ROOT, offset).expect("variable hover");
    assert!(hover.contents.contains("$h"));
    assert!(hover.contents.contains("20"));
}

#[test]
fn test_hover_enum_entry() {
    let src = r#"<Skin><Form name="F"><View align="center"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    let offset = offset_in(src, "\"center\"", 3);
    let hover = analyzer.find_hover(ROOT, offset).expect("enum hover");
    assert!(hover.contents.contains("Centered within the parent."));
}

#[test]
fn test_find_references_style() {
    let mut analyzer = analyzer_with(&[(ROOT, STYLES_SRC)]);
    let offset = offset_in(STYLES_SRC, "style=\"My.primary\"", "style=\"My.pri".len());
    let refs = analyzer.find_references(ROOT, offset);
    // the use site and the definition's name attribute both mention it
    assert!(refs.len() >= 2);
    assert!(refs.iter().all(|r| r.uri == ROOT));
    let use_site = offset_in(STYLES_SRC, "style=\"My.primary\"", "style=\"".len());
    assert!(refs.iter().any(|r| r.range.start == use_site));
}

#[test]
fn test_prepare_rename_and_rename() {
    let mut analyzer = analyzer_with(&[(ROOT, STYLES_SRC)]);
    let offset = offset_in(STYLES_SRC, "style=\"My.primary\"", "style=\"My.pri".len());

    let (range, text) = analyzer.prepare_rename(ROOT, offset).expect("renameable");
    assert_eq!(text, "My.primary");
    assert_eq!(range.len(), "My.primary".len());

    let edits = analyzer.rename(ROOT, offset, "My.main");
    let file_edits = edits.get(ROOT).expect("edits in root");
    assert!(file_edits.len() >= 2);
    assert!(file_edits.iter().all(|(_, replacement)| replacement == "My.main"));
}

#[test]
fn test_color_presentations() {
    let presentations = color_presentations(crate::color::Rgba::opaque(1.0, 0.0, 0.0));
    assert_eq!(presentations[0], "#FF0000");
}

#[test]
fn test_symbol_at_positions() {
    let src = r#"<Skin><Form name="F"><View style="A B"/></Form></Skin>"#;
    let mut analyzer = analyzer_with(&[(ROOT, src)]);
    // style arrays split on whitespace around the cursor
    let offset = offset_in(src, "\"A B\"", 4);
    let defs = analyzer.find_definitions(ROOT, offset);
    // "B" is not defined anywhere: no targets
    assert!(defs.is_empty());
}
