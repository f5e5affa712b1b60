//! JSON rendering for outlines.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{HeadingLevel, Outline, OutlineNode};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Flat outline: title plus leveled headings.
#[derive(Debug, Serialize)]
struct FlatOutline<'a> {
    title: &'a str,
    outline: Vec<FlatHeading<'a>>,
}

#[derive(Debug, Serialize)]
struct FlatHeading<'a> {
    level: HeadingLevel,
    text: &'a str,
    page: u32,
    font_size: f32,
    reason: String,
}

/// Nested outline: source path, size floor, and the heading forest.
#[derive(Debug, Serialize)]
struct NestedOutline {
    path: String,
    min_font_size: f32,
    headings: Vec<OutlineNode>,
}

fn serialize<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Render the flat `{"title", "outline": [...]}` form.
pub fn to_flat_json(outline: &Outline, format: JsonFormat) -> Result<String> {
    let flat = FlatOutline {
        title: &outline.title,
        outline: outline
            .entries
            .iter()
            .map(|e| FlatHeading {
                level: e.level,
                text: &e.text,
                page: e.page,
                font_size: e.font_size,
                reason: e.reasons.join("; "),
            })
            .collect(),
    };
    serialize(&flat, format)
}

/// Render the nested `{"path", "min_font_size", "headings": [...]}` form.
pub fn to_nested_json(outline: &Outline, format: JsonFormat) -> Result<String> {
    let nested = NestedOutline {
        path: outline.path.display().to_string(),
        min_font_size: outline.min_font_size,
        headings: outline.tree(),
    };
    serialize(&nested, format)
}
