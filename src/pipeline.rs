//! Outline extraction pipeline.
//!
//! Pages are read and normalised one at a time; font statistics and
//! boilerplate detection then look at the whole document before any line
//! is classified.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::backend::{DocumentBackend, LopdfBackend};
use crate::boilerplate::remove_boilerplate;
use crate::classifier::{round1, HeadingClassifier, HeadingModel};
use crate::error::{Error, Result};
use crate::features::{extract_features, FeatureVector};
use crate::levels::{LevelAssigner, SizeBounds};
use crate::model::{Candidate, HeadingDecision, Line, Outline, OutlineEntry};
use crate::normalize::normalize_page;
use crate::options::{ErrorMode, OutlineOptions, SizeFloor};
use crate::stats::FontStatistics;

/// The normalised lines of a document, boilerplate removed.
#[derive(Debug, Clone, Default)]
pub struct DocumentLines {
    /// Number of pages in the document
    pub page_count: u32,
    /// Lines in document order
    pub lines: Vec<Line>,
    /// Font sizes of every readable span
    pub stats: FontStatistics,
}

/// One classified candidate with its feature vector, for training data.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRecord {
    pub page: u32,
    pub text: String,
    pub font_size: f32,
    /// Starts within the left margin
    pub left_aligned: bool,
    pub centered: bool,
    /// Whether the pipeline accepted the line as a heading
    pub heading: bool,
    /// Reasons for the acceptance, `"; "`-joined
    pub reason: String,
    pub features: FeatureVector,
}

/// Extracts heading outlines from documents.
///
/// The extractor is immutable and can be shared between threads; the only
/// state it carries across documents is the loaded model.
#[derive(Clone)]
pub struct OutlineExtractor {
    options: OutlineOptions,
    classifier: HeadingClassifier,
}

impl OutlineExtractor {
    /// Create a heuristic-only extractor.
    pub fn new(options: OutlineOptions) -> Self {
        let classifier = HeadingClassifier::heuristics_only(options.heuristics.clone());
        Self {
            options,
            classifier,
        }
    }

    /// Use a trained model for candidates no heuristic accepts.
    pub fn with_model(mut self, model: Option<Arc<dyn HeadingModel>>) -> Self {
        self.classifier = HeadingClassifier::new(model, self.options.heuristics.clone());
        self
    }

    /// Extraction options.
    pub fn options(&self) -> &OutlineOptions {
        &self.options
    }

    /// Whether a trained model is in use.
    pub fn has_model(&self) -> bool {
        self.classifier.has_model()
    }

    /// Extract the outline of a PDF file.
    ///
    /// An encrypted file that no known password opens yields an empty
    /// outline titled with the file stem. The outline records the path
    /// made absolute against the working directory.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Outline> {
        let path = absolute_path(path.as_ref());
        match LopdfBackend::open(&path) {
            Ok(mut backend) => self.extract(&mut backend, &path),
            Err(Error::Encrypted) => Ok(locked_outline(&path)),
            Err(e) => Err(e),
        }
    }

    /// Extract the outline of an in-memory PDF; `name` stands in for the
    /// source path in the title fallback and nested output.
    pub fn extract_bytes(&self, data: &[u8], name: &str) -> Result<Outline> {
        let path = Path::new(name);
        match LopdfBackend::from_bytes(data) {
            Ok(mut backend) => self.extract(&mut backend, path),
            Err(Error::Encrypted) => Ok(locked_outline(path)),
            Err(e) => Err(e),
        }
    }

    /// Extract the outline of a document from any backend.
    pub fn extract<B>(&self, backend: &mut B, path: &Path) -> Result<Outline>
    where
        B: DocumentBackend + ?Sized,
    {
        self.options.validate()?;
        if !self.unlock(backend) {
            return Ok(locked_outline(path));
        }

        let title = document_title(backend.title(), path);
        let document = self.read_lines(backend)?;
        let (decisions, floor) = self.classify(&document);

        let entries: Vec<OutlineEntry> = decisions
            .into_iter()
            .filter(|d| d.accepted)
            .filter_map(into_entry)
            .collect();

        log::debug!(
            "{}: {} headings from {} lines on {} pages",
            path.display(),
            entries.len(),
            document.lines.len(),
            document.page_count
        );

        let mut outline = Outline::new(title, path);
        outline.min_font_size = round1(floor);
        outline.entries = entries;
        Ok(outline)
    }

    /// Normalised, boilerplate-free lines of a document.
    pub fn document_lines<B>(&self, backend: &mut B) -> Result<DocumentLines>
    where
        B: DocumentBackend + ?Sized,
    {
        self.options.validate()?;
        if !self.unlock(backend) {
            return Err(Error::Encrypted);
        }
        self.read_lines(backend)
    }

    /// Every candidate of a document with its features and the pipeline's
    /// verdict, in document order.
    pub fn feature_records<B>(&self, backend: &mut B) -> Result<Vec<FeatureRecord>>
    where
        B: DocumentBackend + ?Sized,
    {
        let document = self.document_lines(backend)?;
        let (decisions, _) = self.classify(&document);
        Ok(decisions
            .iter()
            .map(|d| FeatureRecord {
                page: d.candidate.line.page,
                text: d.candidate.text().to_string(),
                font_size: round1(d.candidate.font_size()),
                left_aligned: d.candidate.is_left_aligned,
                centered: d.candidate.is_centered,
                heading: d.accepted,
                reason: d.reason_text(),
                features: extract_features(&d.candidate),
            })
            .collect())
    }

    /// Try the empty password, then the configured one.
    fn unlock<B>(&self, backend: &mut B) -> bool
    where
        B: DocumentBackend + ?Sized,
    {
        if !backend.is_encrypted() {
            return true;
        }
        if backend.authenticate("") {
            return true;
        }
        match &self.options.password {
            Some(password) => backend.authenticate(password),
            None => false,
        }
    }

    fn read_lines<B>(&self, backend: &B) -> Result<DocumentLines>
    where
        B: DocumentBackend + ?Sized,
    {
        let page_count = backend.page_count();
        let mut stats = FontStatistics::new();
        let mut lines = Vec::new();

        for number in 1..=page_count {
            let page = match backend.page(number) {
                Ok(page) => page,
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping page {}: {}", number, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for span in page.spans() {
                if let Some(size) = span.size {
                    stats.add_size(size);
                }
            }

            let page_lines = normalize_page(&page, &self.options.normalize);
            log::debug!("Page {}: {} lines", number, page_lines.len());
            lines.extend(page_lines);
        }

        let lines = remove_boilerplate(lines, page_count, &self.options.boilerplate);
        Ok(DocumentLines {
            page_count,
            lines,
            stats,
        })
    }

    /// Filter candidates, classify them, and assign levels.
    ///
    /// Returns the decisions in document order and the size floor applied.
    fn classify(&self, document: &DocumentLines) -> (Vec<HeadingDecision>, f32) {
        let floor = match self.options.size_floor {
            SizeFloor::Disabled => 0.0,
            SizeFloor::Percentile(p) => document.stats.percentile(p),
            SizeFloor::Fixed(size) => size,
        };

        let heuristics = &self.options.heuristics;
        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = document
            .lines
            .iter()
            .filter(|l| Candidate::is_eligible(&l.text, self.options.max_candidate_len))
            .filter(|l| l.font_size >= floor)
            .filter(|l| seen.insert(l.text.clone()))
            .map(|l| {
                Candidate::from_line(
                    l.clone(),
                    heuristics.center_tolerance,
                    heuristics.left_margin,
                )
            })
            .collect();

        let max_size = document.stats.max_size();
        let mut decisions = self.classifier.classify(candidates, max_size);

        let bounds = SizeBounds {
            max: max_size,
            min: document.stats.min_size(),
        };
        LevelAssigner::new(self.options.level_strategy, bounds).assign(&mut decisions);

        (decisions, floor)
    }
}

impl Default for OutlineExtractor {
    fn default() -> Self {
        Self::new(OutlineOptions::default())
    }
}

fn into_entry(decision: HeadingDecision) -> Option<OutlineEntry> {
    let level = decision.level?;
    let line = &decision.candidate.line;
    Some(OutlineEntry {
        level,
        text: line.text.clone(),
        page: line.page,
        font_size: round1(line.font_size),
        reasons: decision.reasons().to_vec(),
        y: line.y(),
    })
}

/// Join a relative path onto the working directory without resolving
/// symlinks or `..`; the path is kept as given if the directory is unknown.
fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            log::debug!("No working directory for {}: {}", path.display(), e);
            path.to_path_buf()
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Metadata title when it has content, otherwise the file stem.
fn document_title(metadata: Option<String>, path: &Path) -> String {
    metadata
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| file_stem(path))
}

fn locked_outline(path: &Path) -> Outline {
    log::warn!(
        "{}: encrypted and no known password opens it; writing an empty outline",
        path.display()
    );
    Outline::new(file_stem(path), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_title() {
        let path = Path::new("/data/reports/annual-2023.pdf");
        assert_eq!(document_title(Some("  Annual Report ".into()), path), "Annual Report");
        assert_eq!(document_title(Some("   ".into()), path), "annual-2023");
        assert_eq!(document_title(None, path), "annual-2023");
    }

    #[test]
    fn test_absolute_path() {
        let absolute = Path::new("/data/reports/annual.pdf");
        assert_eq!(absolute_path(absolute), absolute);

        let relative = absolute_path(Path::new("reports/annual.pdf"));
        assert!(relative.is_absolute());
        assert!(relative.ends_with("reports/annual.pdf"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let extractor = OutlineExtractor::default();
        assert!(matches!(
            extractor.extract_file("/nonexistent/input.pdf"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let mut options = OutlineOptions::default();
        options.max_candidate_len = 0;
        let extractor = OutlineExtractor::new(options);
        let mut backend = crate::backend::MemoryBackend::new(Vec::new());
        assert!(matches!(
            extractor.extract(&mut backend, Path::new("x.pdf")),
            Err(Error::InvalidOption(_))
        ));
    }
}
