//! Document outline types.

use std::path::PathBuf;

use serde::Serialize;

use super::HeadingLevel;
use crate::hierarchy::build_hierarchy;

/// An accepted heading in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    /// Outline level
    pub level: HeadingLevel,
    /// Heading text
    pub text: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Average font size of the heading line
    pub font_size: f32,
    /// Evidence for the acceptance
    pub reasons: Vec<String>,
    /// Vertical position on the page (top edge)
    pub y: f32,
}

/// A node of the nested outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    /// Heading text
    pub text: String,
    /// Outline level (1 = shallowest)
    pub level: u8,
    /// Page number (1-indexed)
    pub page: u32,
    /// Nested headings in document order
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Create a childless node.
    pub fn new(text: impl Into<String>, level: u8, page: u32) -> Self {
        Self {
            text: text.into(),
            level,
            page,
            children: Vec::new(),
        }
    }

    /// Count this node and all of its descendants.
    pub fn total_nodes(&self) -> usize {
        1 + self.children.iter().map(|c| c.total_nodes()).sum::<usize>()
    }
}

/// The outline of one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outline {
    /// Document title
    pub title: String,
    /// Source file
    pub path: PathBuf,
    /// Font size floor applied to candidates (0 when disabled)
    pub min_font_size: f32,
    /// Accepted headings in document order
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Create an empty outline.
    pub fn new(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            min_font_size: 0.0,
            entries: Vec::new(),
        }
    }

    /// Number of headings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the outline has no headings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the nested forest from the flat entries.
    pub fn tree(&self) -> Vec<OutlineNode> {
        build_hierarchy(&self.entries)
    }
}
