//! Integration tests for the outline pipeline over in-memory documents.

use std::path::Path;
use std::sync::Arc;

use pdf_outline::backend::{RawBlock, RawLine, RawSpan};
use pdf_outline::classifier::CLASSIFIER_REASON;
use pdf_outline::error::Result;
use pdf_outline::{
    load_model_or_degrade, render, BBox, DocumentBackend, Error, FeatureVector, HeadingModel,
    JsonFormat, LevelStrategy, MemoryBackend, Outline, OutlineExtractor, OutlineOptions,
    OutlineStyle, RawPage, SizeFloor,
};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;

fn text_line(text: &str, size: f32, x0: f32, y0: f32, x1: f32) -> RawLine {
    let bbox = BBox::new(x0, y0, x1, y0 + size);
    RawLine {
        bbox: Some(bbox),
        spans: vec![RawSpan::new(text, size, "Helvetica", bbox)],
    }
}

fn page(number: u32, lines: Vec<RawLine>) -> RawPage {
    let mut page = RawPage::new(number, PAGE_WIDTH, PAGE_HEIGHT);
    page.blocks.push(RawBlock { bbox: None, lines });
    page
}

/// One page: an 18pt numbered heading over three 11pt body lines.
fn introduction_page() -> RawPage {
    page(
        1,
        vec![
            text_line("1. Introduction", 18.0, 72.0, 100.0, 200.0),
            text_line("This report describes the survey method", 11.0, 72.0, 130.0, 250.0),
            text_line("and the data collected during the study", 11.0, 72.0, 145.0, 250.0),
            text_line("across every participating region.", 11.0, 72.0, 160.0, 250.0),
        ],
    )
}

fn extract(extractor: &OutlineExtractor, backend: &mut MemoryBackend) -> Outline {
    extractor
        .extract(backend, Path::new("docs/sample.pdf"))
        .unwrap()
}

/// Accepts every sample it is shown.
struct AcceptAll;

impl HeadingModel for AcceptAll {
    fn predict(&self, batch: &[FeatureVector]) -> Vec<bool> {
        vec![true; batch.len()]
    }
}

/// A backend whose listed pages cannot be read.
struct FlakyBackend {
    inner: MemoryBackend,
    broken: Vec<u32>,
}

impl DocumentBackend for FlakyBackend {
    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    fn page(&self, number: u32) -> Result<RawPage> {
        if self.broken.contains(&number) {
            return Err(Error::PdfParse(format!("bad content stream on page {}", number)));
        }
        self.inner.page(number)
    }

    fn title(&self) -> Option<String> {
        self.inner.title()
    }

    fn is_encrypted(&self) -> bool {
        self.inner.is_encrypted()
    }

    fn authenticate(&mut self, password: &str) -> bool {
        self.inner.authenticate(password)
    }
}

#[test]
fn test_numbered_large_heading() {
    let mut backend = MemoryBackend::new(vec![introduction_page()]);
    let outline = extract(&OutlineExtractor::default(), &mut backend);

    assert_eq!(outline.title, "sample");
    assert_eq!(outline.len(), 1);
    let entry = &outline.entries[0];
    assert_eq!(entry.level.to_string(), "H1");
    assert_eq!(entry.text, "1. Introduction");
    assert_eq!(entry.page, 1);
    assert_eq!(entry.font_size, 18.0);
    assert_eq!(entry.reasons.join("; "), "large font 18; numbered pattern");

    let json = render::to_flat_json(&outline, JsonFormat::Compact).unwrap();
    assert_eq!(
        json,
        r#"{"title":"sample","outline":[{"level":"H1","text":"1. Introduction","page":1,"font_size":18.0,"reason":"large font 18; numbered pattern"}]}"#
    );
}

#[test]
fn test_metadata_title_wins() {
    let mut backend = MemoryBackend::new(vec![introduction_page()]).with_title("Field Survey 2023");
    let outline = extract(&OutlineExtractor::default(), &mut backend);
    assert_eq!(outline.title, "Field Survey 2023");
}

#[test]
fn test_extraction_is_deterministic() {
    let extractor = OutlineExtractor::default();
    let mut first = MemoryBackend::new(vec![introduction_page()]);
    let mut second = MemoryBackend::new(vec![introduction_page()]);

    let a = render::to_flat_json(&extract(&extractor, &mut first), JsonFormat::Pretty).unwrap();
    let b = render::to_flat_json(&extract(&extractor, &mut second), JsonFormat::Pretty).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_repeated_heading_text_kept_once() {
    let pages = (1..=2)
        .map(|n| {
            page(
                n,
                vec![
                    text_line("Methods", 18.0, 72.0, 300.0, 160.0),
                    text_line("Plain body text continues here.", 11.0, 72.0, 330.0, 250.0),
                ],
            )
        })
        .collect();
    let mut backend = MemoryBackend::new(pages);
    let outline = extract(&OutlineExtractor::default(), &mut backend);

    let methods: Vec<_> = outline.entries.iter().filter(|e| e.text == "Methods").collect();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].page, 1);
}

fn draft_document() -> MemoryBackend {
    let pages = (1..=10)
        .map(|n| {
            page(
                n,
                vec![
                    // Centered so it would qualify as a heading on its own.
                    text_line("Confidential Draft", 10.0, 256.0, 20.0, 356.0),
                    text_line(&format!("Chapter {}", n), 18.0, 72.0, 100.0, 180.0),
                    text_line("Body text of the chapter goes here.", 11.0, 72.0, 130.0, 250.0),
                ],
            )
        })
        .collect();
    MemoryBackend::new(pages)
}

#[test]
fn test_running_header_removed() {
    let mut options = OutlineOptions::default();
    options.normalize.header_footer_fraction = 0.0;
    let extractor = OutlineExtractor::new(options);

    let lines = extractor.document_lines(&mut draft_document()).unwrap();
    assert!(lines.lines.iter().all(|l| l.text != "Confidential Draft"));

    let outline = extract(&extractor, &mut draft_document());
    assert_eq!(outline.len(), 10);
    assert!(outline.entries.iter().all(|e| e.text.starts_with("Chapter")));
}

#[test]
fn test_running_header_kept_without_filter() {
    let mut options = OutlineOptions::default();
    options.normalize.header_footer_fraction = 0.0;
    options.boilerplate.min_pages = 100;
    let extractor = OutlineExtractor::new(options);

    let outline = extract(&extractor, &mut draft_document());
    let drafts: Vec<_> = outline
        .entries
        .iter()
        .filter(|e| e.text == "Confidential Draft")
        .collect();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].reasons, ["center aligned"]);
}

#[test]
fn test_missing_model_degrades_to_heuristics() {
    let model = load_model_or_degrade(Some(Path::new("/nonexistent/heading_model.json")));
    assert!(model.is_none());

    let degraded = OutlineExtractor::default().with_model(model);
    assert!(!degraded.has_model());

    let a = extract(&degraded, &mut MemoryBackend::new(vec![introduction_page()]));
    let b = extract(
        &OutlineExtractor::default(),
        &mut MemoryBackend::new(vec![introduction_page()]),
    );
    assert_eq!(a, b);
}

#[test]
fn test_model_judges_remaining_candidates() {
    let model: Arc<dyn HeadingModel> = Arc::new(AcceptAll);
    let extractor = OutlineExtractor::default().with_model(Some(model));
    let outline = extract(&extractor, &mut MemoryBackend::new(vec![introduction_page()]));

    assert_eq!(outline.len(), 4);
    assert_eq!(outline.entries[0].reasons, ["large font 18", "numbered pattern"]);
    for entry in &outline.entries[1..] {
        assert_eq!(entry.reasons, [CLASSIFIER_REASON]);
    }
}

#[test]
fn test_fixed_size_floor_excludes_body() {
    let model: Arc<dyn HeadingModel> = Arc::new(AcceptAll);
    let options = OutlineOptions::default().with_size_floor(SizeFloor::Fixed(12.0));
    let extractor = OutlineExtractor::new(options).with_model(Some(model));
    let outline = extract(&extractor, &mut MemoryBackend::new(vec![introduction_page()]));

    assert_eq!(outline.min_font_size, 12.0);
    assert_eq!(outline.len(), 1);
    assert_eq!(outline.entries[0].text, "1. Introduction");
}

#[test]
fn test_nested_output_is_well_formed() {
    let pages = vec![
        page(
            1,
            vec![
                text_line("Part One", 20.0, 72.0, 100.0, 200.0),
                text_line("Background", 16.0, 72.0, 140.0, 180.0),
                text_line("Prior Work", 14.0, 72.0, 180.0, 170.0),
                text_line("Scope", 16.0, 72.0, 220.0, 140.0),
                text_line("Ordinary paragraph text runs on.", 11.0, 72.0, 260.0, 250.0),
            ],
        ),
        page(
            2,
            vec![
                text_line("Part Two", 20.0, 72.0, 100.0, 200.0),
                text_line("Results", 16.0, 72.0, 140.0, 160.0),
                text_line("Ordinary paragraph text again.", 11.0, 72.0, 180.0, 250.0),
            ],
        ),
    ];
    let model: Arc<dyn HeadingModel> = Arc::new(AcceptAll);
    let options = OutlineOptions::default()
        .with_level_strategy(LevelStrategy::RankBySize)
        .with_size_floor(SizeFloor::Fixed(12.0));
    let extractor = OutlineExtractor::new(options).with_model(Some(model));
    let outline = extract(&extractor, &mut MemoryBackend::new(pages));

    let levels: Vec<u8> = outline.entries.iter().map(|e| e.level.get()).collect();
    assert_eq!(levels, [1, 2, 3, 2, 1, 2]);

    let tree = outline.tree();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.iter().map(|n| n.total_nodes()).sum::<usize>(), outline.len());
    assert_eq!(tree[0].children.len(), 2);
    assert_eq!(tree[0].children[0].children[0].text, "Prior Work");

    let json = render::render(&outline, OutlineStyle::Nested, JsonFormat::Compact).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["path"], "docs/sample.pdf");
    assert_eq!(value["headings"][1]["text"], "Part Two");
    assert_eq!(value["headings"][1]["children"][0]["text"], "Results");
}

#[test]
fn test_locked_document_yields_empty_outline() {
    let mut backend = MemoryBackend::new(vec![introduction_page()])
        .with_title("Secret Plans")
        .with_password("hunter2");
    let outline = extract(&OutlineExtractor::default(), &mut backend);

    assert!(outline.is_empty());
    assert_eq!(outline.title, "sample");
}

#[test]
fn test_configured_password_unlocks() {
    let mut backend = MemoryBackend::new(vec![introduction_page()]).with_password("hunter2");
    let extractor = OutlineExtractor::new(OutlineOptions::default().with_password("hunter2"));
    let outline = extract(&extractor, &mut backend);
    assert_eq!(outline.len(), 1);
}

#[test]
fn test_empty_user_password_unlocks() {
    let mut backend = MemoryBackend::new(vec![introduction_page()]).with_password("");
    let outline = extract(&OutlineExtractor::default(), &mut backend);
    assert_eq!(outline.len(), 1);
}

#[test]
fn test_locked_document_lines_is_an_error() {
    let mut backend = MemoryBackend::new(vec![introduction_page()]).with_password("hunter2");
    let result = OutlineExtractor::default().document_lines(&mut backend);
    assert!(matches!(result, Err(Error::Encrypted)));
}

fn flaky_backend() -> FlakyBackend {
    let pages = (1..=3)
        .map(|n| {
            page(
                n,
                vec![
                    text_line(&format!("Section {}", n), 18.0, 72.0, 100.0, 180.0),
                    text_line("Body text on this page.", 11.0, 72.0, 130.0, 250.0),
                ],
            )
        })
        .collect();
    FlakyBackend {
        inner: MemoryBackend::new(pages),
        broken: vec![2],
    }
}

#[test]
fn test_strict_mode_fails_on_bad_page() {
    let result = OutlineExtractor::default().extract(&mut flaky_backend(), Path::new("flaky.pdf"));
    assert!(matches!(result, Err(Error::PdfParse(_))));
}

#[test]
fn test_lenient_mode_skips_bad_page() {
    let extractor = OutlineExtractor::new(OutlineOptions::default().lenient());
    let outline = extractor
        .extract(&mut flaky_backend(), Path::new("flaky.pdf"))
        .unwrap();

    let pages: Vec<u32> = outline.entries.iter().map(|e| e.page).collect();
    assert_eq!(pages, [1, 3]);
}

#[test]
fn test_feature_records_cover_candidates() {
    let records = OutlineExtractor::default()
        .feature_records(&mut MemoryBackend::new(vec![introduction_page()]))
        .unwrap();

    assert_eq!(records.len(), 4);
    assert!(records[0].heading);
    assert_eq!(records[0].reason, "large font 18; numbered pattern");
    assert!(records[1..].iter().all(|r| !r.heading && r.reason.is_empty()));
    assert_eq!(records[0].features.get(0), 18.0);
}

#[test]
fn test_feature_records_report_alignment() {
    let layout = page(
        1,
        vec![
            text_line("Overview", 14.0, 36.0, 100.0, 110.0),
            text_line("Appendix", 14.0, 270.0, 200.0, 342.0),
            text_line("Each region reported its own totals.", 11.0, 72.0, 230.0, 260.0),
            text_line("Totals were checked against last year", 11.0, 72.0, 245.0, 260.0),
            text_line("before the board approved them.", 11.0, 72.0, 260.0, 240.0),
        ],
    );
    let records = OutlineExtractor::default()
        .feature_records(&mut MemoryBackend::new(vec![layout]))
        .unwrap();

    let flags: Vec<(&str, bool, bool)> = records
        .iter()
        .map(|r| (r.text.as_str(), r.left_aligned, r.centered))
        .collect();
    assert_eq!(flags.len(), 5);
    assert_eq!(
        flags[..3],
        [
            ("Overview", true, false),
            ("Appendix", false, true),
            ("Each region reported its own totals.", false, false),
        ]
    );

    let json = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(json["left_aligned"], true);
}

#[test]
fn test_empty_document() {
    let outline = extract(&OutlineExtractor::default(), &mut MemoryBackend::new(Vec::new()));
    assert!(outline.is_empty());
    assert_eq!(outline.title, "sample");
}
