//! Criterion benchmarks for analyzer core operations.
//!
//! Run with: `cargo bench`
//!
//! Synthetic skin content keeps the numbers reproducible across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use skinlint::document::Document;
use skinlint::expr;
use skinlint::model::{guess_type, AttrType};
use skinlint::pack::{DefinitionType, SkinFileInfo};
use skinlint::xml;

// ─── Helpers ─────────────────────────────────────────────────────────

/// Build a synthetic skin file with `forms` forms, each holding `views`
/// views, plus a styles block.
fn synthetic_skin(forms: usize, views: usize) -> String {
    let mut out = String::from("<Skin>\n  <Styles>\n");
    for i in 0..forms {
        out.push_str(&format!("    <Style name=\"Style_{}\" color=\"#336699\"/>\n", i));
    }
    out.push_str("  </Styles>\n");
    for f in 0..forms {
        out.push_str(&format!("  <Form name=\"Form_{}\">\n", f));
        out.push_str(&format!("    <define row.height=\"{}\" row.color=\"#AABBCC\"/>\n", 20 + f));
        for v in 0..views {
            out.push_str(&format!(
                "    <View name=\"View_{}_{}\" style=\"Style_{}\" height=\"$row.height\"/>\n",
                f,
                v,
                v % forms.max(1)
            ));
        }
        out.push_str("  </Form>\n");
    }
    out.push_str("</Skin>\n");
    out
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_xml_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("xml_parse");
    for (forms, views) in [(10, 10), (50, 20)] {
        let src = synthetic_skin(forms, views);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", forms, views)),
            &src,
            |b, src| b.iter(|| xml::parse_document(black_box(src))),
        );
    }
    group.finish();
}

fn bench_file_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_indexing");
    for (forms, views) in [(10, 10), (50, 20)] {
        let src = synthetic_skin(forms, views);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", forms, views)),
            &src,
            |b, src| {
                b.iter(|| {
                    let info = SkinFileInfo::parse("bench.xml", black_box(src), None, None);
                    black_box(info.definition_names(DefinitionType::Form).count())
                })
            },
        );
    }
    group.finish();
}

fn bench_expression_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression_eval");
    for input in ["(2+3)*4 > 19 & 1", "100 % 7 + 3 * (2 - 1)", "'12' + '30' = 42"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| expr::evaluate(black_box(input)))
        });
    }
    group.finish();
}

fn bench_token_at(c: &mut Criterion) {
    let src = synthetic_skin(20, 20);
    let doc = Document::new("bench.xml", src, 1);
    let offset = doc.text.rfind("style=\"").map(|i| i + 9).unwrap_or(0);
    c.bench_function("token_at", |b| {
        b.iter(|| doc.token_at(black_box(offset)))
    });
}

fn bench_guess_type(c: &mut Criterion) {
    c.bench_function("guess_type", |b| {
        b.iter(|| {
            black_box(guess_type("View", black_box("backgroundcolor"), AttrType::STRING));
            black_box(guess_type("ShapeImage", black_box("url"), AttrType::STRING));
            black_box(guess_type("View", black_box("tooltip"), AttrType::STRING));
        })
    });
}

criterion_group!(
    benches,
    bench_xml_parse,
    bench_file_indexing,
    bench_expression_eval,
    bench_token_at,
    bench_guess_type
);
criterion_main!(benches);
