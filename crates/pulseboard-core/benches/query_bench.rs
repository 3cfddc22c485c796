use criterion::{criterion_group, criterion_main, Criterion};
use pulseboard_core::{derive_preview, fts_match_expression};

fn bench_derive_preview(c: &mut Criterion) {
    let short = "weekly sync notes".to_string();
    let long = "lorem ipsum dolor sit amet ".repeat(40);

    c.bench_function("derive_preview_short", |b| b.iter(|| derive_preview(&short)));
    c.bench_function("derive_preview_long", |b| b.iter(|| derive_preview(&long)));
}

fn bench_match_expression(c: &mut Criterion) {
    let query = "project roadmap quarterly review schedule";

    c.bench_function("fts_match_expression", |b| b.iter(|| fts_match_expression(query)));
}

criterion_group!(benches, bench_derive_preview, bench_match_expression);
criterion_main!(benches);
