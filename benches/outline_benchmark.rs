//! Benchmarks for outline extraction.
//!
//! Run with: cargo bench
//!
//! Documents are synthetic in-memory pages, so the numbers cover
//! normalisation, boilerplate removal, classification, and level
//! assignment without PDF parsing.

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pdf_outline::backend::{RawBlock, RawLine, RawSpan};
use pdf_outline::{
    render, BBox, JsonFormat, LevelStrategy, MemoryBackend, OutlineExtractor, OutlineOptions,
    RawPage,
};

fn text_line(text: String, size: f32, x0: f32, y0: f32, x1: f32) -> RawLine {
    let bbox = BBox::new(x0, y0, x1, y0 + size);
    RawLine {
        bbox: Some(bbox),
        spans: vec![RawSpan::new(text, size, "Helvetica", bbox)],
    }
}

/// A page with a running header, a numbered heading, and body text.
fn create_page(number: u32) -> RawPage {
    let mut lines = vec![
        text_line("Quarterly Review".to_string(), 9.0, 256.0, 20.0, 356.0),
        text_line(format!("{}. Section {}", number, number), 18.0, 72.0, 100.0, 240.0),
    ];
    for i in 0..40 {
        let y = 130.0 + i as f32 * 14.0;
        lines.push(text_line(
            format!("Body text line {} on page {} of the benchmark document.", i, number),
            11.0,
            72.0,
            y,
            250.0,
        ));
        if i % 10 == 9 {
            lines.push(text_line(
                format!("{}.{} Subsection", number, i / 10 + 1),
                14.0,
                72.0,
                y + 12.0,
                200.0,
            ));
        }
    }

    let mut page = RawPage::new(number, 612.0, 792.0);
    page.blocks.push(RawBlock { bbox: None, lines });
    page
}

fn create_document(page_count: u32) -> MemoryBackend {
    MemoryBackend::new((1..=page_count).map(create_page).collect())
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for pages in [1, 10, 100] {
        let document = create_document(pages);
        group.bench_with_input(BenchmarkId::new("rules", pages), &document, |b, doc| {
            let extractor = OutlineExtractor::default();
            b.iter(|| {
                let mut backend = doc.clone();
                extractor
                    .extract(black_box(&mut backend), Path::new("bench.pdf"))
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("rank", pages), &document, |b, doc| {
            let options = OutlineOptions::default().with_level_strategy(LevelStrategy::RankBySize);
            let extractor = OutlineExtractor::new(options);
            b.iter(|| {
                let mut backend = doc.clone();
                extractor
                    .extract(black_box(&mut backend), Path::new("bench.pdf"))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut backend = create_document(100);
    let outline = OutlineExtractor::default()
        .extract(&mut backend, Path::new("bench.pdf"))
        .unwrap();

    c.bench_function("render_flat", |b| {
        b.iter(|| render::to_flat_json(black_box(&outline), JsonFormat::Compact).unwrap())
    });
    c.bench_function("render_nested", |b| {
        b.iter(|| render::to_nested_json(black_box(&outline), JsonFormat::Compact).unwrap())
    });
}

criterion_group!(benches, bench_extract, bench_render);
criterion_main!(benches);
