//! Positioned text: spans, bounding boxes, and merged lines.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in page space.
///
/// Coordinates are top-down: `y0` is the top edge and grows towards the
/// bottom of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// A zero-area box carries no position (missing bbox in source data).
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 && self.height() <= 0.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Style flags of a span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
}

/// Check whether a font name marks a bold face.
///
/// Only the capitalised `Bold` marker counts. Trained models learned the
/// bold feature from exactly this test, so heavier weights (`Black`,
/// `Heavy`) and lowercase spellings stay regular.
pub fn is_bold_font_name(font_name: &str) -> bool {
    font_name.contains("Bold")
}

/// Check whether a font name marks an italic face.
pub fn is_italic_font_name(font_name: &str) -> bool {
    let name = font_name.to_lowercase();
    name.contains("italic") || name.contains("oblique")
}

/// A minimal styled text fragment read from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// The text content
    pub text: String,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Style flags, from the backend or inferred from the font name
    pub style: SpanStyle,
    /// Position on the page
    pub bbox: BBox,
    /// Page number (1-indexed)
    pub page: u32,
}

impl Span {
    /// Create a new span, inferring style from the font name.
    pub fn new(text: String, font_size: f32, font_name: String, bbox: BBox, page: u32) -> Self {
        let style = SpanStyle {
            bold: is_bold_font_name(&font_name),
            italic: is_italic_font_name(&font_name),
        };
        Self {
            text,
            font_size,
            font_name,
            style,
            bbox,
            page,
        }
    }

    /// Replace the inferred style with flags reported by the backend.
    ///
    /// Flags are OR-ed with the font-name inference so that a bold font name
    /// is never downgraded by an incomplete flag set.
    pub fn with_style(mut self, style: SpanStyle) -> Self {
        self.style.bold |= style.bold;
        self.style.italic |= style.italic;
        self
    }

    /// Number of characters, used as the weight of this span's font size.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// One visual row of text made of one or more spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Concatenated text, trimmed
    pub text: String,
    /// Character-weighted average font size
    pub font_size: f32,
    /// Distinct font names of the composing spans
    pub fonts: BTreeSet<String>,
    /// Whether any composing span is bold
    pub has_bold_span: bool,
    /// Union of the span boxes
    pub bbox: BBox,
    /// Page number (1-indexed)
    pub page: u32,
    /// Page width in points
    pub page_width: f32,
    /// Page height in points
    pub page_height: f32,
    /// Number of spans merged into this line
    pub span_count: usize,
    /// Blank space between this line and the previous line on the page
    pub space_above: Option<f32>,
    /// Blank space between this line and the next line on the page
    pub space_below: Option<f32>,
}

impl Line {
    /// Build a line from spans on the same row.
    ///
    /// Spans are ordered left to right. Returns `None` when no span is given.
    pub fn from_spans(
        mut spans: Vec<Span>,
        page: u32,
        page_width: f32,
        page_height: f32,
    ) -> Option<Self> {
        if spans.is_empty() {
            return None;
        }

        spans.sort_by(|a, b| {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_chars: usize = spans.iter().map(Span::char_count).sum();
        let weighted_size: f32 = spans
            .iter()
            .map(|s| s.font_size * s.char_count() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted_size / total_chars as f32
        } else {
            spans[0].font_size
        };

        let bbox = spans
            .iter()
            .map(|s| s.bbox)
            .filter(|b| !b.is_empty())
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or_default();

        let fonts = spans
            .iter()
            .filter(|s| !s.font_name.is_empty())
            .map(|s| s.font_name.clone())
            .collect();

        Some(Self {
            text: join_spans(&spans).trim().to_string(),
            font_size,
            fonts,
            has_bold_span: spans.iter().any(|s| s.style.bold),
            bbox,
            page,
            page_width,
            page_height,
            span_count: spans.len(),
            space_above: None,
            space_below: None,
        })
    }

    /// Attach the measured blank space around this line.
    pub fn with_spacing(mut self, above: Option<f32>, below: Option<f32>) -> Self {
        self.space_above = above;
        self.space_below = below;
        self
    }

    /// Vertical position (top edge).
    pub fn y(&self) -> f32 {
        self.bbox.y0
    }

    /// Whether any composing font name carries a bold marker.
    pub fn has_bold_font(&self) -> bool {
        self.fonts.iter().any(|f| is_bold_font_name(f))
    }

    /// Whether the text has cased letters and all of them are uppercase.
    pub fn is_all_caps(&self) -> bool {
        let mut cased = self
            .text
            .chars()
            .filter(|c| c.is_lowercase() || c.is_uppercase())
            .peekable();
        cased.peek().is_some() && cased.all(|c| c.is_uppercase())
    }
}

/// Join span texts, inserting a space where the horizontal gap calls for one.
fn join_spans(spans: &[Span]) -> String {
    let mut result = String::new();

    for (i, span) in spans.iter().enumerate() {
        if i == 0 {
            result.push_str(&span.text);
            continue;
        }

        let prev = &spans[i - 1];

        // Missing boxes carry no gap information; treat them as adjacent.
        let gap = if prev.bbox.is_empty() || span.bbox.is_empty() {
            0.0
        } else {
            span.bbox.x0 - prev.bbox.x1
        };

        let char_count = span.char_count();
        let avg_char_width = if char_count > 0 && span.bbox.width() > 0.0 {
            span.bbox.width() / char_count as f32
        } else {
            span.font_size * 0.5
        };

        let prev_last = prev.text.chars().last();
        let curr_first = span.text.chars().next();

        let wants_space = gap > avg_char_width * 0.2
            && !(prev_last.map(is_spaceless_script_char).unwrap_or(false)
                && curr_first.map(is_spaceless_script_char).unwrap_or(false));

        let has_space = prev_last.map(char::is_whitespace).unwrap_or(false)
            || curr_first.map(char::is_whitespace).unwrap_or(false);

        if wants_space && !has_space {
            result.push(' ');
        }
        result.push_str(&span.text);
    }

    result
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
