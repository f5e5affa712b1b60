//! Data model for outline extraction.
//!
//! Spans and lines describe positioned text; candidates and decisions carry
//! the heading classification; entries and nodes form the final outline.

mod heading;
mod line;
mod outline;

pub use heading::{Candidate, HeadingDecision, HeadingLevel};
pub use line::{
    is_bold_font_name, is_italic_font_name, is_spaceless_script_char, BBox, Line, Span, SpanStyle,
};
pub use outline::{Outline, OutlineEntry, OutlineNode};
