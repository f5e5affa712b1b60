//! Rendering of outlines to their JSON output forms.

mod json;

pub use json::{to_flat_json, to_nested_json, JsonFormat};

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::model::Outline;

/// Shape of the rendered outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlineStyle {
    /// Title plus a flat list of leveled headings
    #[default]
    Flat,
    /// Source path, size floor, and a nested heading forest
    Nested,
}

impl fmt::Display for OutlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

impl FromStr for OutlineStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "nested" | "tree" => Ok(Self::Nested),
            _ => Err(format!("Unknown outline style '{s}'. Expected: flat, nested")),
        }
    }
}

/// Render an outline in the given style and format.
pub fn render(outline: &Outline, style: OutlineStyle, format: JsonFormat) -> Result<String> {
    match style {
        OutlineStyle::Flat => to_flat_json(outline, format),
        OutlineStyle::Nested => to_nested_json(outline, format),
    }
}
