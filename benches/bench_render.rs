use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use xlesson::{render_lesson, render_prose};

mod helpers;
use helpers::synthetic_lesson;

fn bench_render_prose(c: &mut Criterion) {
    let paragraph = "Some *emphasis*, **strong**, ~~gone~~, `code` and [a link](https://example.com).\n";
    let table = "| a | b |\n|---|---|\n| 1 | 2 |\n";
    for (name, text) in [
        ("paragraph", paragraph.repeat(20)),
        ("table", table.repeat(20)),
        ("mixed", format!("# Title\n\n{}\n> quote\n\n- x\n- y\n\n{}", paragraph.repeat(5), table)),
    ] {
        c.bench_with_input(BenchmarkId::new("render_prose", name), &text, |b, text| {
            b.iter(|| black_box(render_prose(text).to_html()));
        });
    }
}

fn bench_render_lesson(c: &mut Criterion) {
    let source = synthetic_lesson(10);
    c.bench_function("render_lesson_10_sections_html", |b| {
        b.iter(|| black_box(render_lesson(&source).to_html()));
    });
}

criterion_group!(benches, bench_render_prose, bench_render_lesson);
criterion_main!(benches);
