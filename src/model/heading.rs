//! Heading candidates, decisions, and levels.

use std::fmt;

use serde::{Serialize, Serializer};

use super::Line;

/// Characters that on their own form decorative rules or bullets, not text.
const DECORATION_CHARS: &[char] = &['-', '–', '—', '•', '.', ' ', '_', '·', '*'];

/// An outline level: 1 is the shallowest (H1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Create a level, clamped to a minimum of 1.
    pub fn new(level: u8) -> Self {
        Self(level.max(1))
    }

    /// The numeric depth.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

impl Serialize for HeadingLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A line eligible for heading consideration.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The underlying line
    pub line: Line,
    /// Any composing font is bold
    pub is_bold: bool,
    /// All cased letters are uppercase
    pub is_all_caps: bool,
    /// Line centre is close to the page centre
    pub is_centered: bool,
    /// Line starts near the left page edge
    pub is_left_aligned: bool,
}

impl Candidate {
    /// Check the shape-level filters on a line's text.
    ///
    /// A candidate is non-empty, not made only of punctuation or bullet
    /// characters, contains at least one letter, and is at most `max_len`
    /// characters long.
    pub fn is_eligible(text: &str, max_len: usize) -> bool {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > max_len {
            return false;
        }
        if text.chars().all(|c| DECORATION_CHARS.contains(&c)) {
            return false;
        }
        text.chars().any(char::is_alphabetic)
    }

    /// Wrap a line, computing its layout predicates.
    ///
    /// `center_tolerance` is a fraction of page width; `left_margin` is in points.
    pub fn from_line(line: Line, center_tolerance: f32, left_margin: f32) -> Self {
        let page_center = line.page_width / 2.0;
        let is_centered =
            (line.bbox.center_x() - page_center).abs() < line.page_width * center_tolerance;
        let is_left_aligned = line.bbox.x0.abs() < left_margin;

        Self {
            is_bold: line.has_bold_span || line.has_bold_font(),
            is_all_caps: line.is_all_caps(),
            is_centered,
            is_left_aligned,
            line,
        }
    }

    /// The candidate's text.
    pub fn text(&self) -> &str {
        &self.line.text
    }

    /// The candidate's average font size.
    pub fn font_size(&self) -> f32 {
        self.line.font_size
    }
}

/// Outcome of classifying a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingDecision {
    /// The candidate being judged
    pub candidate: Candidate,
    /// Whether the candidate was accepted as a heading
    pub accepted: bool,
    /// Ordered evidence for the acceptance
    reasons: Vec<String>,
    /// Outline level, once resolved
    pub level: Option<HeadingLevel>,
}

impl HeadingDecision {
    /// Start an undecided (rejected) decision for a candidate.
    pub fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            accepted: false,
            reasons: Vec::new(),
            level: None,
        }
    }

    /// Accept with additional evidence.
    pub fn accept<I, S>(&mut self, reasons: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted = true;
        self.reasons.extend(reasons.into_iter().map(Into::into));
    }

    /// Evidence collected so far.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Reasons joined for display.
    pub fn reason_text(&self) -> String {
        self.reasons.join("; ")
    }
}
