//! Running header and footer detection across pages.
//!
//! A text that sits near the top or bottom edge at the same height on
//! nearly every page is page furniture, not a heading, however large its
//! font. Detection needs every page of the document, so it runs after the
//! per-page scan.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Line;
use crate::options::BoilerplateOptions;

/// Recurring (text, height bucket) pairs of one document.
#[derive(Debug, Clone, Default)]
pub struct RepeatedText {
    pairs: BTreeSet<(String, i32)>,
    y_tolerance: f32,
}

impl RepeatedText {
    /// Find the pairs that recur in the margins of more than
    /// `options.page_ratio` of the document's pages.
    pub fn detect(lines: &[Line], page_count: u32, options: &BoilerplateOptions) -> Self {
        let mut found = Self {
            pairs: BTreeSet::new(),
            y_tolerance: options.y_tolerance,
        };
        if page_count == 0 || (page_count as usize) < options.min_pages {
            return found;
        }

        let mut pages_seen: BTreeMap<(String, i32), BTreeSet<u32>> = BTreeMap::new();
        for line in lines {
            let y = line.y();
            let in_margin = y < options.margin || line.page_height - y < options.margin;
            if in_margin {
                pages_seen
                    .entry(found.key(line))
                    .or_default()
                    .insert(line.page);
            }
        }

        found.pairs = pages_seen
            .into_iter()
            .filter(|(_, pages)| pages.len() as f32 / page_count as f32 > options.page_ratio)
            .map(|(key, _)| key)
            .collect();

        if !found.pairs.is_empty() {
            log::debug!("Detected {} running header/footer texts", found.pairs.len());
        }
        found
    }

    fn key(&self, line: &Line) -> (String, i32) {
        (line.text.clone(), bucket(line.y(), self.y_tolerance))
    }

    /// Whether a line is one of the recurring texts.
    pub fn contains(&self, line: &Line) -> bool {
        !self.pairs.is_empty() && self.pairs.contains(&self.key(line))
    }

    /// Number of recurring pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing recurs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Bucket index of a height; the bucketed value is `index * tolerance`.
fn bucket(y: f32, tolerance: f32) -> i32 {
    (y / tolerance).round() as i32
}

/// Drop every line that matches a recurring header/footer pair.
pub fn remove_boilerplate(
    lines: Vec<Line>,
    page_count: u32,
    options: &BoilerplateOptions,
) -> Vec<Line> {
    let repeated = RepeatedText::detect(&lines, page_count, options);
    if repeated.is_empty() {
        return lines;
    }
    lines.into_iter().filter(|l| !repeated.contains(l)).collect()
}
