//! Variable resolver tests: scope walks, foreach unrolling, form-boundary
//! traversal, cycle protection.

use super::*;
use crate::host::FileSystem;
use crate::testutil::Fixture;

const ROOT: &str = "/repo/skins/main/skin.xml";

/// Offset of the start of the tag whose text contains `marker`.
fn elem_offset(fx: &Fixture, uri: &str, marker: &str) -> usize {
    let text = fx.fs.read(std::path::Path::new(uri)).unwrap();
    let at = text.find(marker).unwrap_or_else(|| panic!("marker {:?} not found", marker));
    text[..at].rfind('<').expect("marker inside a tag")
}

#[test]
fn test_no_variables_passthrough() {
    let mut fx = Fixture::with_files(&[(ROOT, r#"<Skin><Form name="F"/></Skin>"#)]);
    let off = elem_offset(&fx, ROOT, "Form");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "plain"), vec!["plain"]);
}

#[test]
fn test_define_resolution() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define row.height="20"/>
    <View name="V" height="$row.height"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$row.height"), vec!["20"]);
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "h_$row.height"), vec!["h_20"]);
}

#[test]
fn test_foreach_numeric_unroll() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <foreach variable="i" start="1" count="3">
      <View name="Row_$i"/>
    </foreach>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "Row_$i");
    let (ctx, reg) = fx.split();
    assert_eq!(
        resolve_variable(reg, &ctx, ROOT, off, "Row_$i"),
        vec!["Row_1", "Row_2", "Row_3"]
    );
}

#[test]
fn test_foreach_list_values() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <foreach variable="side" in="left,right">
      <View name="Cell_$side"/>
    </foreach>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "Cell_$side");
    let (ctx, reg) = fx.split();
    assert_eq!(
        resolve_variable(reg, &ctx, ROOT, off, "Cell_$side"),
        vec!["Cell_left", "Cell_right"]
    );
}

#[test]
fn test_foreach_non_numeric_stays_symbolic() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <foreach variable="i" start="$base" count="2">
      <View name="V" height="$i"/>
    </foreach>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "height=\"$i\"");
    let (ctx, reg) = fx.split();
    let resolved = resolve_variable(reg, &ctx, ROOT, off, "$i");
    assert_eq!(resolved, vec!["@foreach:($base,2)"]);
}

#[test]
fn test_styleselector_values_qualified() {
    let mut fx = Fixture::with_files(&[
        (
            ROOT,
            r#"<Skin><Include name="Widgets" url="widgets.xml"/></Skin>"#,
        ),
        (
            "/repo/skins/main/widgets.xml",
            r#"<Skin>
  <Form name="F">
    <styleselector variable="$s" styles="Big Small">
      <View name="V" style="$s"/>
    </styleselector>
  </Form>
</Skin>"#,
        ),
    ]);
    let widgets = "/repo/skins/main/widgets.xml";
    let off = elem_offset(&fx, widgets, "style=\"$s\"");
    let (ctx, reg) = fx.split();
    reg.ensure_pack_indexed(ROOT, &ctx);
    assert_eq!(
        resolve_variable(reg, &ctx, widgets, off, "$s"),
        vec!["Widgets/Big", "Widgets/Small"]
    );
}

#[test]
fn test_form_boundary_traversal() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="Row">
    <View name="Inner" height="$row.height"/>
  </Form>
  <Form name="Host">
    <define row.height="32"/>
    <View name="Row"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"Inner\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$row.height"), vec!["32"]);
}

#[test]
fn test_form_boundary_multiple_sites() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="Row">
    <View name="Inner" height="$h"/>
  </Form>
  <Form name="HostA">
    <define h="10"/>
    <View name="Row"/>
  </Form>
  <Form name="HostB">
    <define h="20"/>
    <View name="Row"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"Inner\"");
    let (ctx, reg) = fx.split();
    let mut resolved = resolve_variable(reg, &ctx, ROOT, off, "$h");
    resolved.sort();
    assert_eq!(resolved, vec!["10", "20"]);
}

#[test]
fn test_instantiation_cycle_terminates() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="A">
    <View name="B" height="$x"/>
  </Form>
  <Form name="B">
    <View name="A"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "height=\"$x\"");
    let (ctx, reg) = fx.split();
    // unresolvable, but must terminate and echo the token
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$x"), vec!["$x"]);
}

#[test]
fn test_self_containing_substitution_rejected() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define x="a$x"/>
    <View name="V" height="$x"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$x"), vec!["$x"]);
}

#[test]
fn test_chained_defines_fixed_point() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define base="8"/>
    <define total="$base"/>
    <View name="V" height="$total"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$total"), vec!["8"]);
}

#[test]
fn test_nearest_define_shadows() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define x="outer"/>
    <foreach variable="k" in="a">
      <define x="inner"/>
      <View name="V" height="$x"/>
    </foreach>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$x"), vec!["inner"]);
}

#[test]
fn test_longest_name_match_wins() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define row="R" row.height="20"/>
    <View name="V" height="$row.height"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    // `row.height` (postfix 0) beats `row` + ".height" (postfix 7)
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$row.height"), vec!["20"]);
}

#[test]
fn test_theme_metric_resolution() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <View name="V" height="$Theme.padding"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$Theme.padding"), vec!["8"]);
    // longest metric name wins
    assert_eq!(
        resolve_variable(reg, &ctx, ROOT, off, "$Theme.padding.small"),
        vec!["4"]
    );
}

#[test]
fn test_eval_folding() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define h="@eval:(10+5)"/>
    <View name="V" height="$h"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    assert_eq!(resolve_variable(reg, &ctx, ROOT, off, "$h"), vec!["15"]);
}

#[test]
fn test_variables_in_scope_prefix() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r##"<Skin>
  <Form name="F">
    <define row.height="20" row.color="#111" other="x"/>
    <View name="V" height="$row.height"/>
  </Form>
</Skin>"##,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    let vars = variables_in_scope(reg, &ctx, ROOT, off, "row.");
    assert_eq!(vars, vec!["row.color", "row.height"]);
    let all = variables_in_scope(reg, &ctx, ROOT, off, "");
    assert!(all.contains(&"other".to_string()));
}

#[test]
fn test_find_define_sites_at() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define row.height="20"/>
    <View name="V" height="$row.height"/>
  </Form>
</Skin>"#,
    )]);
    let off = elem_offset(&fx, ROOT, "name=\"V\"");
    let (ctx, reg) = fx.split();
    let sites = find_define_sites_at(reg, &ctx, ROOT, off, "$row.height", false);
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].uri, ROOT);

    // exact matching rejects postfix resolution
    let exact = find_define_sites_at(reg, &ctx, ROOT, off, "$row.heightpx", true);
    assert!(exact.is_empty());
    let postfix = find_define_sites_at(reg, &ctx, ROOT, off, "$row.heightpx", false);
    assert_eq!(postfix.len(), 1);
}

#[test]
fn test_find_define_sites_file_wide() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define row.height="20"/>
    <foreach variable="i" start="0" count="2"><View name="X_$i"/></foreach>
  </Form>
</Skin>"#,
    )]);
    let (ctx, reg) = fx.split();
    let sites = find_define_sites(reg, &ctx, ROOT, "$row.height", false);
    assert_eq!(sites.len(), 1);
    let loops = find_define_sites(reg, &ctx, ROOT, "$i", false);
    assert_eq!(loops.len(), 1);
}

#[test]
fn test_lookup_definition_variable_type() {
    let mut fx = Fixture::with_files(&[(
        ROOT,
        r#"<Skin>
  <Form name="F">
    <define row.height="20"/>
  </Form>
</Skin>"#,
    )]);
    let (ctx, reg) = fx.split();
    let hits = reg.lookup_definition(
        DefinitionType::Variable,
        "$row.height",
        ROOT,
        &crate::pack::ScopeOptions::default(),
        &ctx,
    );
    assert_eq!(hits.len(), 1);
}
