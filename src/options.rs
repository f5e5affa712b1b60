//! Extraction options and configuration.

use crate::error::{Error, Result};
use crate::levels::LevelStrategy;

/// Options for turning raw spans into lines.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Fraction of page height treated as header/footer band at top and bottom
    pub header_footer_fraction: f32,
    /// Lines made of more spans than this are treated as table rows
    pub table_span_threshold: usize,
    /// Raw lines whose vertical centres differ by less than this fraction of
    /// the font size are merged into one line
    pub line_merge_tolerance: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            header_footer_fraction: 0.1,
            table_span_threshold: 10,
            line_merge_tolerance: 0.3,
        }
    }
}

/// Options for the cross-page running header/footer filter.
#[derive(Debug, Clone, PartialEq)]
pub struct BoilerplateOptions {
    /// A text must recur on more than this fraction of pages
    pub page_ratio: f32,
    /// Distance from the top or bottom edge, in points, that counts as margin
    pub margin: f32,
    /// Vertical positions are bucketed to this many points
    pub y_tolerance: f32,
    /// Documents with fewer pages skip the filter
    pub min_pages: usize,
}

impl Default for BoilerplateOptions {
    fn default() -> Self {
        Self {
            page_ratio: 0.8,
            margin: 50.0,
            y_tolerance: 5.0,
            min_pages: 2,
        }
    }
}

/// Thresholds for the heuristic heading pass.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicOptions {
    /// A line within this many points of the document maximum is "large"
    pub large_font_tolerance: f32,
    /// A line whose centre is within this fraction of page width from the
    /// page centre is "centered"
    pub center_tolerance: f32,
    /// A line starting within this many points of the left edge is left-aligned
    pub left_margin: f32,
    /// Blank space of at least this multiple of the font size counts as a
    /// blank line
    pub blank_gap_ratio: f32,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            large_font_tolerance: 0.5,
            center_tolerance: 0.2,
            left_margin: 50.0,
            blank_gap_ratio: 1.0,
        }
    }
}

/// Minimum average font size a line needs to be a heading candidate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SizeFloor {
    /// No floor
    #[default]
    Disabled,
    /// Floor at a percentile (0.0..=1.0) of the document's span sizes
    Percentile(f32),
    /// Fixed floor in points
    Fixed(f32),
}

impl SizeFloor {
    /// The "auto" floor: 20th percentile of the document's font sizes.
    pub fn auto() -> Self {
        SizeFloor::Percentile(0.2)
    }

    /// Parse "auto", "off", or a size in points.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::auto()),
            "off" | "none" => Ok(Self::Disabled),
            other => other
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(Self::Fixed)
                .ok_or_else(|| Error::InvalidOption(format!("min font size '{}'", s))),
        }
    }
}

/// Error handling mode for unreadable pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail the document on the first unreadable page
    #[default]
    Strict,
    /// Skip unreadable pages and continue
    Lenient,
}

/// Options for extracting an outline from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineOptions {
    /// Span-to-line normalisation
    pub normalize: NormalizeOptions,
    /// Running header/footer detection
    pub boilerplate: BoilerplateOptions,
    /// Heuristic pass thresholds
    pub heuristics: HeuristicOptions,
    /// Candidates longer than this many characters are ignored
    pub max_candidate_len: usize,
    /// Minimum font size for candidates
    pub size_floor: SizeFloor,
    /// Level assignment policy
    pub level_strategy: LevelStrategy,
    /// Error handling mode
    pub error_mode: ErrorMode,
    /// Password tried after the empty password on encrypted documents
    pub password: Option<String>,
}

impl OutlineOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level assignment policy.
    pub fn with_level_strategy(mut self, strategy: LevelStrategy) -> Self {
        self.level_strategy = strategy;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip unreadable pages).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set the candidate font size floor.
    pub fn with_size_floor(mut self, floor: SizeFloor) -> Self {
        self.size_floor = floor;
        self
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set normalisation options.
    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }

    /// Set boilerplate filter options.
    pub fn with_boilerplate(mut self, boilerplate: BoilerplateOptions) -> Self {
        self.boilerplate = boilerplate;
        self
    }

    /// Set heuristic thresholds.
    pub fn with_heuristics(mut self, heuristics: HeuristicOptions) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Check that every fraction and threshold is in range.
    pub fn validate(&self) -> Result<()> {
        let fraction = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::InvalidOption(format!("{} must be within 0..=1, got {}", name, v)))
            }
        };
        fraction("header_footer_fraction", self.normalize.header_footer_fraction)?;
        fraction("page_ratio", self.boilerplate.page_ratio)?;
        fraction("center_tolerance", self.heuristics.center_tolerance)?;
        if let SizeFloor::Percentile(p) = self.size_floor {
            fraction("size floor percentile", p)?;
        }
        if self.boilerplate.y_tolerance <= 0.0 {
            return Err(Error::InvalidOption("y_tolerance must be positive".to_string()));
        }
        if self.max_candidate_len == 0 {
            return Err(Error::InvalidOption("max_candidate_len must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            boilerplate: BoilerplateOptions::default(),
            heuristics: HeuristicOptions::default(),
            max_candidate_len: 250,
            size_floor: SizeFloor::Disabled,
            level_strategy: LevelStrategy::default(),
            error_mode: ErrorMode::Strict,
            password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_options_builder() {
        let options = OutlineOptions::new()
            .lenient()
            .with_level_strategy(LevelStrategy::RankBySize)
            .with_size_floor(SizeFloor::Fixed(9.0))
            .with_password("secret");

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.level_strategy, LevelStrategy::RankBySize);
        assert_eq!(options.size_floor, SizeFloor::Fixed(9.0));
        assert_eq!(options.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_default_options() {
        let options = OutlineOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert_eq!(options.max_candidate_len, 250);
        assert_eq!(options.normalize.table_span_threshold, 10);
        assert_eq!(options.boilerplate.page_ratio, 0.8);
        assert_eq!(options.level_strategy, LevelStrategy::RuleCascade);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut options = OutlineOptions::default();
        options.normalize.header_footer_fraction = 1.5;
        assert!(matches!(options.validate(), Err(Error::InvalidOption(_))));

        let options = OutlineOptions::default().with_size_floor(SizeFloor::Percentile(2.0));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_size_floor_parse() {
        assert_eq!(SizeFloor::parse("auto").unwrap(), SizeFloor::Percentile(0.2));
        assert_eq!(SizeFloor::parse("OFF").unwrap(), SizeFloor::Disabled);
        assert_eq!(SizeFloor::parse("9.5").unwrap(), SizeFloor::Fixed(9.5));
        assert!(SizeFloor::parse("-1").is_err());
        assert!(SizeFloor::parse("big").is_err());
    }
}
