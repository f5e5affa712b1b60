//! # pdf-outline
//!
//! Heading outline extraction for PDF documents.
//!
//! This library turns the positioned text spans of a PDF into a clean,
//! deduplicated, leveled outline: a title plus headings H1..Hn, flat or
//! nested. Layout heuristics decide first and leave an auditable reason
//! trail; an optional trained model judges the lines no heuristic accepts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_outline::{extract_outline, render};
//!
//! fn main() -> pdf_outline::Result<()> {
//!     let outline = extract_outline("document.pdf")?;
//!
//!     for entry in &outline.entries {
//!         println!("{} {} (page {})", entry.level, entry.text, entry.page);
//!     }
//!
//!     let json = render::to_flat_json(&outline, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Reason trail**: every accepted heading lists the rules that matched
//! - **Boilerplate removal**: running headers, footers, and table rows are skipped
//! - **Two level strategies**: rank by font size, or a rule cascade
//! - **Pluggable model**: any [`HeadingModel`]; a JSON tree ensemble ships built in
//! - **Batch processing**: whole directories in parallel with Rayon

pub mod backend;
pub mod batch;
pub mod boilerplate;
pub mod classifier;
pub mod detect;
pub mod error;
pub mod features;
pub mod hierarchy;
pub mod levels;
pub mod model;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod render;
pub mod stats;

// Re-export commonly used types
pub use backend::{DocumentBackend, LopdfBackend, MemoryBackend, RawPage};
pub use batch::{run_batch, BatchOptions, BatchReport};
pub use classifier::{load_model_or_degrade, ForestModel, HeadingClassifier, HeadingModel};
pub use error::{Error, Result};
pub use features::{extract_features, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use levels::LevelStrategy;
pub use model::{
    BBox, Candidate, HeadingDecision, HeadingLevel, Line, Outline, OutlineEntry, OutlineNode,
    Span,
};
pub use options::{
    BoilerplateOptions, ErrorMode, HeuristicOptions, NormalizeOptions, OutlineOptions, SizeFloor,
};
pub use pipeline::{DocumentLines, FeatureRecord, OutlineExtractor};
pub use render::{JsonFormat, OutlineStyle};

use std::path::{Path, PathBuf};

/// Extract the outline of a PDF file with default options.
///
/// Runs heuristics only; use [`PdfOutline`] to add a model.
///
/// # Example
///
/// ```no_run
/// use pdf_outline::extract_outline;
///
/// let outline = extract_outline("document.pdf").unwrap();
/// println!("{}: {} headings", outline.title, outline.len());
/// ```
pub fn extract_outline<P: AsRef<Path>>(path: P) -> Result<Outline> {
    OutlineExtractor::default().extract_file(path)
}

/// Extract the outline of a PDF file with custom options.
pub fn extract_outline_with_options<P: AsRef<Path>>(
    path: P,
    options: OutlineOptions,
) -> Result<Outline> {
    OutlineExtractor::new(options).extract_file(path)
}

/// Extract a PDF file's outline straight to flat JSON.
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let outline = extract_outline(path)?;
    render::to_flat_json(&outline, format)
}

/// Builder-style entry point.
///
/// # Example
///
/// ```no_run
/// use pdf_outline::{LevelStrategy, PdfOutline};
///
/// let json = PdfOutline::new()
///     .with_model("models/heading_model.json")
///     .with_strategy(LevelStrategy::RankBySize)
///     .lenient()
///     .extract("document.pdf")?
///     .to_nested_json()?;
/// # Ok::<(), pdf_outline::Error>(())
/// ```
pub struct PdfOutline {
    options: OutlineOptions,
    model_path: Option<PathBuf>,
    format: JsonFormat,
}

impl PdfOutline {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: OutlineOptions::default(),
            model_path: None,
            format: JsonFormat::Pretty,
        }
    }

    /// Skip unreadable pages instead of failing.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Set the level assignment strategy.
    pub fn with_strategy(mut self, strategy: LevelStrategy) -> Self {
        self.options = self.options.with_level_strategy(strategy);
        self
    }

    /// Set the candidate font size floor.
    pub fn with_size_floor(mut self, floor: SizeFloor) -> Self {
        self.options = self.options.with_size_floor(floor);
        self
    }

    /// Set document password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.options = self.options.with_password(password);
        self
    }

    /// Use a model artifact; an unloadable artifact falls back to heuristics.
    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Emit compact JSON.
    pub fn compact(mut self) -> Self {
        self.format = JsonFormat::Compact;
        self
    }

    fn extractor(&self) -> OutlineExtractor {
        let model = load_model_or_degrade(self.model_path.as_deref());
        OutlineExtractor::new(self.options.clone()).with_model(model)
    }

    /// Extract the outline of a PDF file.
    pub fn extract<P: AsRef<Path>>(self, path: P) -> Result<OutlineResult> {
        let outline = self.extractor().extract_file(path)?;
        Ok(OutlineResult {
            outline,
            format: self.format,
        })
    }

    /// Extract the outline of an in-memory PDF.
    pub fn extract_bytes(self, data: &[u8], name: &str) -> Result<OutlineResult> {
        let outline = self.extractor().extract_bytes(data, name)?;
        Ok(OutlineResult {
            outline,
            format: self.format,
        })
    }
}

impl Default for PdfOutline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a builder extraction.
pub struct OutlineResult {
    outline: Outline,
    format: JsonFormat,
}

impl OutlineResult {
    /// Render as flat JSON.
    pub fn to_json(&self) -> Result<String> {
        render::to_flat_json(&self.outline, self.format)
    }

    /// Render as nested JSON.
    pub fn to_nested_json(&self) -> Result<String> {
        render::to_nested_json(&self.outline, self.format)
    }

    /// The extracted outline.
    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Take ownership of the outline.
    pub fn into_outline(self) -> Outline {
        self.outline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = PdfOutline::new();
        assert_eq!(builder.options, OutlineOptions::default());
        assert!(builder.model_path.is_none());
        assert_eq!(builder.format, JsonFormat::Pretty);
    }

    #[test]
    fn test_builder_chain() {
        let builder = PdfOutline::new()
            .lenient()
            .with_strategy(LevelStrategy::RankBySize)
            .with_size_floor(SizeFloor::auto())
            .with_password("pw")
            .with_model("missing.json")
            .compact();
        assert_eq!(builder.options.error_mode, ErrorMode::Lenient);
        assert_eq!(builder.options.level_strategy, LevelStrategy::RankBySize);
        assert_eq!(builder.options.size_floor, SizeFloor::Percentile(0.2));
        assert_eq!(builder.format, JsonFormat::Compact);
        // A missing artifact degrades to heuristics.
        assert!(!builder.extractor().has_model());
    }

    #[test]
    fn test_extract_bytes_rejects_non_pdf() {
        let result = PdfOutline::new().extract_bytes(b"hello", "hello.pdf");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
