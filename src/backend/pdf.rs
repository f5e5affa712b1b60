//! PDF backend built on lopdf.
//!
//! Walks each page's content stream, tracking the text matrix through the
//! text positioning operators, and records every shown string with its
//! bounding box. Strings are grouped into rows, adjacent strings of one font
//! and size are joined into a single span, and rows are grouped into blocks
//! the way a reader would see them.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::{DocumentBackend, RawBlock, RawLine, RawPage, RawSpan};
use crate::detect::{detect_header, detect_header_from_path};
use crate::error::{Error, Result};
use crate::model::BBox;

/// US Letter, used when a page declares no MediaBox.
const DEFAULT_PAGE_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

/// Ascender and descender as fractions of the font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// TJ adjustments beyond this many thousandths of an em read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Strings of one font and size closer than this many ems form one span.
const MERGE_GAP_RATIO: f32 = 1.0;

/// A gap between joined strings wider than this many ems becomes a space.
/// Estimated widths are off by up to about half a glyph, so they need more.
const WORD_GAP_MEASURED: f32 = 0.2;
const WORD_GAP_ESTIMATED: f32 = 0.45;

/// Concrete [`DocumentBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    unlocked: bool,
}

impl LopdfBackend {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect_header_from_path(path)?;
        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_document(doc))
    }

    /// Load a PDF from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        detect_header(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_document(doc))
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        Self {
            doc,
            unlocked: false,
        }
    }

    /// PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// MediaBox of a page as `[llx, lly, urx, ury]`, following inheritance.
    fn page_box(&self, page_id: ObjectId) -> [f32; 4] {
        let mut current = self.doc.get_dictionary(page_id).ok();
        // Bounded walk; malformed files can contain Parent cycles.
        for _ in 0..32 {
            let Some(dict) = current else {
                break;
            };
            if let Some(values) = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|o| o.as_array().ok())
            {
                let numbers: Vec<f32> = values
                    .iter()
                    .filter_map(|v| self.resolve(v).and_then(get_number))
                    .collect();
                if let [x0, y0, x1, y1] = numbers[..] {
                    return [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
                }
            }
            current = dict.get(b"Parent").ok().and_then(|p| self.resolve_dict(p));
        }
        DEFAULT_PAGE_BOX
    }

    /// Decompressed content of a page; a page without contents is blank.
    fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let mut content = Vec::new();
        match self.resolve(contents) {
            Some(Object::Stream(stream)) => content.extend(stream_data(stream)?),
            Some(Object::Array(parts)) => {
                for part in parts {
                    if let Some(Object::Stream(stream)) = self.resolve(part) {
                        content.extend(stream_data(stream)?);
                        content.push(b'\n');
                    }
                }
            }
            _ => return Err(Error::PdfParse("Invalid content stream".to_string())),
        }
        Ok(content)
    }

    /// Walk a page's content stream and collect every shown string.
    fn collect_spans(&self, page_id: ObjectId) -> Result<Vec<PlacedSpan>> {
        let fonts: BTreeMap<Vec<u8>, &Dictionary> = self.doc.get_page_fonts(page_id)?;
        let content = self.page_content(page_id)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let content = lopdf::content::Content::decode(&content)?;

        let widths: BTreeMap<&[u8], FontWidths> = fonts
            .iter()
            .filter_map(|(key, font)| self.font_widths(font).map(|w| (key.as_slice(), w)))
            .collect();
        let advance_of = |font_key: &[u8], bytes: &[u8], text: &str| match widths.get(font_key) {
            Some(w) => (w.advance(bytes), true),
            None => (text.chars().count() as f32 * GLYPH_WIDTH_RATIO, false),
        };

        let mut state = TextState::default();
        let mut spans = Vec::new();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "BT" => state.begin(),
                "ET" => state.in_text = false,
                "Tf" => {
                    if let [Object::Name(key), size, ..] = operands.as_slice() {
                        state.font_name = fonts
                            .get(key)
                            .and_then(|f| f.get(b"BaseFont").ok())
                            .and_then(|o| o.as_name().ok())
                            .map(|n| String::from_utf8_lossy(n).to_string())
                            .unwrap_or_else(|| String::from_utf8_lossy(key).to_string());
                        state.font_key = key.clone();
                        state.font_size = get_number(size).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        state.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands.as_slice() {
                        let tx = get_number(tx).unwrap_or(0.0);
                        let ty = get_number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        state.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if operands.len() >= 6 {
                        let n: Vec<f32> = operands[..6]
                            .iter()
                            .map(|o| get_number(o).unwrap_or(0.0))
                            .collect();
                        state.line = TextMatrix::new(n[0], n[1], n[2], n[3], n[4], n[5]);
                        state.matrix = state.line;
                    }
                }
                "T*" => state.next_line(),
                "Tj" | "'" | "\"" => {
                    if op.operator != "Tj" {
                        state.next_line();
                    }
                    let index = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = operands.get(index) {
                        let text = self.decode(&fonts, &state.font_key, bytes);
                        let (advance, measured) = advance_of(&state.font_key, bytes, &text);
                        state.show(text, advance, measured, &mut spans);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let mut text = String::new();
                        let mut advance = 0.0;
                        let mut measured = true;
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    let part = self.decode(&fonts, &state.font_key, bytes);
                                    let (part_advance, part_measured) =
                                        advance_of(&state.font_key, bytes, &part);
                                    advance += part_advance;
                                    measured &= part_measured;
                                    text.push_str(&part);
                                }
                                other => {
                                    if let Some(adjust) = get_number(other) {
                                        advance -= adjust / 1000.0;
                                        if -adjust > TJ_SPACE_THRESHOLD && needs_word_space(&text) {
                                            text.push(' ');
                                        }
                                    }
                                }
                            }
                        }
                        state.show(text, advance, measured, &mut spans);
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    /// Glyph widths of a simple font, when the font declares them.
    fn font_widths(&self, font: &Dictionary) -> Option<FontWidths> {
        // Composite fonts use multi-byte codes and a different width table.
        let composite = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|name| name == b"Type0");
        if composite {
            return None;
        }
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(get_number)?;
        let widths: Vec<f32> = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())?
            .iter()
            .map(|w| self.resolve(w).and_then(get_number).unwrap_or(0.0))
            .collect();
        if widths.is_empty() || first_char < 0.0 {
            return None;
        }
        Some(FontWidths {
            first_char: first_char as usize,
            widths,
        })
    }

    /// Decode a string with the font's encoding, falling back to a plain
    /// byte decoding when the font or its encoding is unusable.
    fn decode(&self, fonts: &BTreeMap<Vec<u8>, &Dictionary>, font_key: &[u8], bytes: &[u8]) -> String {
        fonts
            .get(font_key)
            .and_then(|font| font.get_font_encoding(&self.doc).ok())
            .and_then(|encoding| LopdfDocument::decode_text(&encoding, bytes).ok())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| decode_text_simple(bytes))
    }
}

impl DocumentBackend for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    fn page(&self, number: u32) -> Result<RawPage> {
        let pages = self.doc.get_pages();
        let page_id = *pages
            .get(&number)
            .ok_or(Error::PageOutOfRange(number, pages.len() as u32))?;

        let [llx, lly, urx, ury] = self.page_box(page_id);
        let (width, height) = (urx - llx, ury - lly);

        let spans = self.collect_spans(page_id)?;
        let rows: Vec<Vec<PlacedSpan>> = group_into_rows(spans)
            .into_iter()
            .map(merge_runs)
            .filter(|row| !row.is_empty())
            .collect();
        let blocks = group_rows_into_blocks(rows)
            .into_iter()
            .map(|rows| {
                let lines: Vec<RawLine> = rows
                    .iter()
                    .map(|row| {
                        let spans: Vec<RawSpan> = row
                            .iter()
                            .map(|s| s.to_raw(llx, lly, height))
                            .collect();
                        RawLine {
                            bbox: union_boxes(spans.iter().filter_map(|s| s.bbox)),
                            spans,
                        }
                    })
                    .collect();
                RawBlock {
                    bbox: union_boxes(lines.iter().filter_map(|l| l.bbox)),
                    lines,
                }
            })
            .collect();

        Ok(RawPage {
            number,
            width,
            height,
            blocks,
        })
    }

    fn title(&self) -> Option<String> {
        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.resolve_dict(o))?;
        info.get(b"Title")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(pdf_string)
    }

    fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted() && !self.unlocked
    }

    fn authenticate(&mut self, password: &str) -> bool {
        match self.doc.decrypt(password) {
            Ok(()) => {
                self.unlocked = true;
                true
            }
            Err(e) => {
                log::debug!("Password rejected: {}", e);
                false
            }
        }
    }
}

/// Stream bytes, decompressed when the stream declares a filter.
fn stream_data(stream: &lopdf::Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Widths table of a simple font, in thousandths of an em.
#[derive(Debug, Clone)]
struct FontWidths {
    first_char: usize,
    widths: Vec<f32>,
}

impl FontWidths {
    /// Advance of a byte string in ems. Codes outside the table use the
    /// average glyph width.
    fn advance(&self, bytes: &[u8]) -> f32 {
        bytes
            .iter()
            .map(|&code| {
                (code as usize)
                    .checked_sub(self.first_char)
                    .and_then(|i| self.widths.get(i))
                    .map(|w| w / 1000.0)
                    .unwrap_or(GLYPH_WIDTH_RATIO)
            })
            .sum()
    }
}

/// A shown string in PDF user space (y grows upwards).
#[derive(Debug, Clone)]
struct PlacedSpan {
    text: String,
    x: f32,
    baseline: f32,
    width: f32,
    size: f32,
    font: String,
    /// Width comes from the font's widths table rather than an estimate
    measured: bool,
}

impl PlacedSpan {
    /// Horizontal distance from this span's end to `next`'s start.
    fn gap_to(&self, next: &PlacedSpan) -> f32 {
        next.x - (self.x + self.width)
    }

    /// Whether `next` continues this span: same font and size, starting at
    /// or after this one and less than a glyph away.
    fn continues_with(&self, next: &PlacedSpan) -> bool {
        self.font == next.font
            && (self.size - next.size).abs() < 0.01
            && next.x >= self.x
            && self.gap_to(next) <= self.size * MERGE_GAP_RATIO
    }

    fn absorb(&mut self, next: PlacedSpan) {
        let word_gap = if self.measured && next.measured {
            WORD_GAP_MEASURED
        } else {
            WORD_GAP_ESTIMATED
        };
        if self.gap_to(&next) > self.size * word_gap
            && needs_word_space(&self.text)
            && !next.text.starts_with(char::is_whitespace)
        {
            self.text.push(' ');
        }
        self.text.push_str(&next.text);
        self.width = (next.x + next.width).max(self.x + self.width) - self.x;
        self.measured &= next.measured;
    }

    /// Convert to a top-down span relative to the page origin.
    fn to_raw(&self, llx: f32, lly: f32, page_height: f32) -> RawSpan {
        let x0 = self.x - llx;
        let baseline = self.baseline - lly;
        let bbox = BBox::new(
            x0,
            page_height - (baseline + self.size * ASCENT),
            x0 + self.width,
            page_height - (baseline - self.size * DESCENT),
        );
        RawSpan::new(self.text.clone(), self.size, self.font.clone(), bbox)
    }
}

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    matrix: TextMatrix,
    line: TextMatrix,
    leading: f32,
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    in_text: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: TextMatrix::default(),
            line: TextMatrix::default(),
            leading: 0.0,
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
            in_text: false,
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.in_text = true;
        self.matrix = TextMatrix::default();
        self.line = TextMatrix::default();
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line.translate(tx, ty);
        self.matrix = self.line;
    }

    fn next_line(&mut self) {
        // Unset leading falls back to single spacing.
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    /// Record a shown string and advance by `advance` ems.
    ///
    /// Whitespace strings are kept so explicit spaces survive joining; they
    /// are dropped once rows are assembled.
    fn show(&mut self, text: String, advance: f32, measured: bool, spans: &mut Vec<PlacedSpan>) {
        let advance = advance * self.font_size;
        if self.in_text && !text.is_empty() {
            let scale = self.matrix.scale();
            spans.push(PlacedSpan {
                text,
                x: self.matrix.e,
                baseline: self.matrix.f,
                width: advance * scale,
                size: self.font_size * scale,
                font: self.font_name.clone(),
                measured,
            });
        }
        self.matrix.translate(advance, 0.0);
    }
}

/// Affine text matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl TextMatrix {
    fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pre-multiply by a translation in text space.
    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    /// Vertical scale factor.
    fn scale(&self) -> f32 {
        let scale = (self.b * self.b + self.d * self.d).sqrt();
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

/// Group spans sharing a baseline into rows, top of the page first.
fn group_into_rows(mut spans: Vec<PlacedSpan>) -> Vec<Vec<PlacedSpan>> {
    spans.sort_by(|a, b| {
        b.baseline
            .partial_cmp(&a.baseline)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<Vec<PlacedSpan>> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.size * 0.3;
        let same_row = current_y.is_some_and(|y| (span.baseline - y).abs() <= tolerance);
        match rows.last_mut() {
            Some(row) if same_row => row.push(span),
            _ => {
                current_y = Some(span.baseline);
                rows.push(vec![span]);
            }
        }
    }

    rows
}

/// Join adjacent strings of one font and size into single spans, left to
/// right, and drop what is left as whitespace only.
///
/// Producers that place text glyph by glyph or word by word would otherwise
/// turn one styled run into dozens of spans.
fn merge_runs(mut row: Vec<PlacedSpan>) -> Vec<PlacedSpan> {
    row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<PlacedSpan> = Vec::with_capacity(row.len());
    for span in row {
        match merged.last_mut() {
            Some(prev) if prev.continues_with(&span) => prev.absorb(span),
            _ => merged.push(span),
        }
    }
    merged.retain(|s| !s.text.trim().is_empty());
    merged
}

/// Split rows into blocks at large gaps and font size changes.
fn group_rows_into_blocks(rows: Vec<Vec<PlacedSpan>>) -> Vec<Vec<Vec<PlacedSpan>>> {
    let gaps: Vec<f32> = rows
        .windows(2)
        .map(|w| (row_baseline(&w[0]) - row_baseline(&w[1])).abs())
        .filter(|g| *g > 0.1)
        .collect();
    let avg_gap = if gaps.is_empty() {
        12.0
    } else {
        gaps.iter().sum::<f32>() / gaps.len() as f32
    };

    let mut blocks: Vec<Vec<Vec<PlacedSpan>>> = Vec::new();
    for row in rows {
        let starts_block = match blocks.last().and_then(|b| b.last()) {
            Some(prev) => {
                (row_baseline(prev) - row_baseline(&row)).abs() > avg_gap * 1.5
                    || (row_size(prev) - row_size(&row)).abs() > 1.0
            }
            None => true,
        };
        if starts_block {
            blocks.push(vec![row]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(row);
        }
    }
    blocks
}

fn row_baseline(row: &[PlacedSpan]) -> f32 {
    row.first().map(|s| s.baseline).unwrap_or(0.0)
}

fn row_size(row: &[PlacedSpan]) -> f32 {
    row.iter().map(|s| s.size).fold(0.0_f32, f32::max)
}

fn union_boxes(boxes: impl Iterator<Item = BBox>) -> Option<BBox> {
    boxes.reduce(|acc, b| acc.union(&b))
}

/// A TJ gap becomes a space unless the text already ends in one or is
/// written in a script without word spaces.
fn needs_word_space(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && !crate::model::is_spaceless_script_char(c),
        None => false,
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else PDFDocEncoding).
fn pdf_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

/// Decode bytes without font information: UTF-16BE with BOM, UTF-8, or Latin-1.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
