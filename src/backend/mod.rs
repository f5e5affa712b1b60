//! Document backend abstraction.
//!
//! A backend turns a document into pages of raw styled spans. Everything
//! after this seam works on [`RawPage`] values and never sees a concrete
//! PDF library type. Span fields are optional because real extractors
//! report incomplete data; the normaliser decides what to keep.

mod pdf;
mod memory;

pub use pdf::LopdfBackend;
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{BBox, SpanStyle};

/// A text fragment as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: Option<String>,
    /// Font size in points
    pub size: Option<f32>,
    pub font: Option<String>,
    pub flags: Option<SpanStyle>,
    pub bbox: Option<BBox>,
}

impl RawSpan {
    /// A fully populated span.
    pub fn new(text: impl Into<String>, size: f32, font: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: Some(text.into()),
            size: Some(size),
            font: Some(font.into()),
            flags: None,
            bbox: Some(bbox),
        }
    }
}

/// A row of spans as grouped by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub bbox: Option<BBox>,
    pub spans: Vec<RawSpan>,
}

/// A group of lines as grouped by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub bbox: Option<BBox>,
    pub lines: Vec<RawLine>,
}

/// One page of raw spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Page number (1-indexed)
    pub number: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    pub blocks: Vec<RawBlock>,
}

impl RawPage {
    /// Create an empty page.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
        }
    }

    /// Iterate over every span of the page in reading order.
    pub fn spans(&self) -> impl Iterator<Item = &RawSpan> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flat_map(|l| l.spans.iter())
    }
}

/// Abstract access to a paged document.
///
/// Pages are numbered from 1.
pub trait DocumentBackend {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Read one page.
    fn page(&self, number: u32) -> Result<RawPage>;

    /// Title from the document metadata, if any.
    fn title(&self) -> Option<String>;

    /// Whether the document is encrypted and not yet unlocked.
    fn is_encrypted(&self) -> bool;

    /// Try to unlock the document. Returns `true` on success.
    fn authenticate(&mut self, password: &str) -> bool;
}
