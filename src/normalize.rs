//! Span normalisation: raw backend spans to clean, ordered lines.

use unicode_normalization::UnicodeNormalization;

use crate::backend::{RawPage, RawSpan};
use crate::model::{Line, Span};
use crate::options::NormalizeOptions;

/// A raw line's spans with its vertical centre, before merging.
struct Row {
    spans: Vec<Span>,
    /// `None` when no span carries a position
    center: Option<f32>,
    /// Smallest span font size
    min_size: f32,
}

impl Row {
    fn new(spans: Vec<Span>) -> Self {
        let positioned: Vec<_> = spans.iter().filter(|s| !s.bbox.is_empty()).collect();
        let center = if positioned.is_empty() {
            None
        } else {
            let top = positioned.iter().map(|s| s.bbox.y0).fold(f32::MAX, f32::min);
            let bottom = positioned.iter().map(|s| s.bbox.y1).fold(f32::MIN, f32::max);
            Some((top + bottom) / 2.0)
        };
        let min_size = spans.iter().map(|s| s.font_size).fold(f32::MAX, f32::min);
        Self {
            spans,
            center,
            min_size,
        }
    }

    fn sort_key(&self) -> f32 {
        self.center.unwrap_or(0.0)
    }

    fn same_row(&self, other: &Row, tolerance: f32) -> bool {
        match (self.center, other.center) {
            (Some(a), Some(b)) => (a - b).abs() < tolerance * self.min_size.min(other.min_size),
            _ => false,
        }
    }

    fn absorb(&mut self, other: Row) {
        self.spans.extend(other.spans);
        *self = Row::new(std::mem::take(&mut self.spans));
    }
}

/// Convert one raw span, or `None` when it cannot be used.
///
/// Missing text and non-finite sizes make a span unusable. Other missing
/// fields fall back to zero, empty, or a zero box.
fn convert_span(raw: &RawSpan, page: u32) -> Option<Span> {
    let text = raw.text.as_deref()?;
    let size = raw.size.unwrap_or(0.0);
    if !size.is_finite() {
        return None;
    }
    let text: String = text.nfkc().collect();
    if text.is_empty() {
        return None;
    }
    let span = Span::new(
        text,
        size,
        raw.font.clone().unwrap_or_default(),
        raw.bbox.unwrap_or_default(),
        page,
    );
    Some(match raw.flags {
        Some(flags) => span.with_style(flags),
        None => span,
    })
}

/// Turn a page of raw spans into lines in top-to-bottom order.
///
/// Rows on the same baseline are merged, probable table rows and lines in
/// the header/footer bands are dropped, and the blank space between
/// consecutive kept lines is measured.
pub fn normalize_page(page: &RawPage, options: &NormalizeOptions) -> Vec<Line> {
    let mut rows: Vec<Row> = page
        .blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .map(|raw| {
            raw.spans
                .iter()
                .filter_map(|s| convert_span(s, page.number))
                .collect::<Vec<_>>()
        })
        .filter(|spans| !spans.is_empty())
        .map(Row::new)
        .collect();

    rows.sort_by(|a, b| {
        a.sort_key()
            .partial_cmp(&b.sort_key())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        match merged.last_mut() {
            Some(prev) if prev.same_row(&row, options.line_merge_tolerance) => prev.absorb(row),
            _ => merged.push(row),
        }
    }

    let band = page.height * options.header_footer_fraction;
    let mut lines: Vec<Line> = merged
        .into_iter()
        .filter_map(|row| Line::from_spans(row.spans, page.number, page.width, page.height))
        .filter(|line| !line.text.is_empty())
        .filter(|line| line.span_count <= options.table_span_threshold)
        .filter(|line| !in_margin_band(line, page.height, band))
        .collect();

    measure_spacing(&mut lines);
    lines
}

/// Whether a positioned line lies entirely inside the top or bottom band.
fn in_margin_band(line: &Line, page_height: f32, band: f32) -> bool {
    if line.bbox.is_empty() || band <= 0.0 {
        return false;
    }
    line.bbox.y1 <= band || line.bbox.y0 >= page_height - band
}

/// Set `space_above`/`space_below` from the gaps between consecutive lines.
fn measure_spacing(lines: &mut [Line]) {
    let gaps: Vec<Option<f32>> = lines
        .windows(2)
        .map(|w| {
            if w[0].bbox.is_empty() || w[1].bbox.is_empty() {
                None
            } else {
                Some((w[1].bbox.y0 - w[0].bbox.y1).max(0.0))
            }
        })
        .collect();

    for (i, line) in lines.iter_mut().enumerate() {
        line.space_above = i.checked_sub(1).and_then(|j| gaps[j]);
        line.space_below = gaps.get(i).copied().flatten();
    }
}
