//! Feature extraction for the heading classifier.
//!
//! [`extract_features`] is the only place the feature vector is computed. The
//! same function serves inference and training-data export, so the two can
//! never drift apart.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::model::{is_bold_font_name, Candidate};

/// Dimension of the feature vector.
pub const FEATURE_COUNT: usize = 8;

/// Names of the feature columns, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "font_size",
    "is_bold",
    "is_numbered",
    "is_colon",
    "word_count",
    "stop_ratio",
    "starts_upper",
    "ends_punct",
];

/// Closed set of function words used for the stop-word ratio.
const STOP_WORDS: [&str; 11] = [
    "and", "the", "of", "in", "to", "for", "with", "on", "by", "at", "from",
];

static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\b").unwrap());

/// Feature vector for one candidate line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Value at a feature index; out-of-range indices read as zero.
    pub fn get(&self, index: usize) -> f32 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// The raw values.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Text starts with dot-separated section numbering ("2", "2.1.3").
pub fn is_numbered(text: &str) -> bool {
    NUMBERED.is_match(text)
}

/// Text ends with a colon.
pub fn has_trailing_colon(text: &str) -> bool {
    text.ends_with(':')
}

/// Trimmed text starts with a bullet or bold markup.
pub fn has_bullet_prefix(text: &str) -> bool {
    let text = text.trim();
    text.starts_with('-') || text.starts_with('•') || text.starts_with("**")
}

/// Text ends with a period, question mark, or exclamation mark.
pub fn has_terminal_punctuation(text: &str) -> bool {
    text.ends_with(['.', '?', '!'])
}

/// Fraction of whitespace-separated words that are stop words.
pub fn stop_word_ratio(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let stops = words
        .iter()
        .filter(|w| STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .count();
    stops as f32 / words.len() as f32
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Compute the feature vector of a line from its text, size, and fonts.
pub fn features_for<'a, I>(text: &str, font_size: f32, fonts: I) -> FeatureVector
where
    I: IntoIterator<Item = &'a String>,
{
    let bold = fonts.into_iter().any(|f| is_bold_font_name(f));
    let starts_upper = text.chars().next().is_some_and(char::is_uppercase);

    FeatureVector([
        font_size,
        flag(bold),
        flag(is_numbered(text)),
        flag(has_trailing_colon(text)),
        text.split_whitespace().count() as f32,
        stop_word_ratio(text),
        flag(starts_upper),
        flag(has_terminal_punctuation(text)),
    ])
}

/// Compute the feature vector of a candidate.
pub fn extract_features(candidate: &Candidate) -> FeatureVector {
    features_for(
        candidate.text(),
        candidate.font_size(),
        &candidate.line.fonts,
    )
}
