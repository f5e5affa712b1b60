//! Batch driver: every PDF of a directory to one JSON outline each.
//!
//! Documents are independent. A failure is logged and recorded in the
//! report, and the remaining documents still run. Output files appear
//! whole or not at all.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::detect::has_pdf_extension;
use crate::error::Result;
use crate::pipeline::OutlineExtractor;
use crate::render::{render, JsonFormat, OutlineStyle};

/// Batch run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Output shape
    pub style: OutlineStyle,
    /// JSON formatting
    pub format: JsonFormat,
    /// Process documents on the rayon thread pool
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            style: OutlineStyle::Flat,
            format: JsonFormat::Pretty,
            parallel: true,
        }
    }
}

/// A document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Output files written, in input order
    pub written: Vec<PathBuf>,
    /// Inputs that failed, in input order
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Total documents attempted.
    pub fn total(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    /// Whether every document succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// PDF files directly inside `dir`, sorted by name.
pub fn find_pdfs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_pdf_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Output path for an input: same stem, `.json` extension.
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    output_dir.join(format!("{}.json", stem))
}

/// Write through a temporary sibling file and rename into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension(format!("json.tmp.{}", std::process::id()));
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Extract, render, and write one document.
pub fn process_file(
    extractor: &OutlineExtractor,
    input: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<PathBuf> {
    let outline = extractor.extract_file(input)?;
    let json = render(&outline, options.style, options.format)?;
    let output = output_path(input, output_dir);
    write_atomic(&output, &json)?;
    log::info!(
        "{} -> {} ({} headings)",
        input.display(),
        output.display(),
        outline.len()
    );
    Ok(output)
}

/// Process every PDF of `input_dir` into `output_dir`.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    extractor: &OutlineExtractor,
    options: &BatchOptions,
) -> Result<BatchReport> {
    run_batch_with_progress(input_dir, output_dir, extractor, options, |_| {})
}

/// Like [`run_batch`], calling `on_done` after each document.
pub fn run_batch_with_progress<F>(
    input_dir: &Path,
    output_dir: &Path,
    extractor: &OutlineExtractor,
    options: &BatchOptions,
    on_done: F,
) -> Result<BatchReport>
where
    F: Fn(&Path) + Sync,
{
    let inputs = find_pdfs(input_dir)?;
    fs::create_dir_all(output_dir)?;
    log::info!("Processing {} PDF files from {}", inputs.len(), input_dir.display());

    let process = |input: &PathBuf| {
        let result = process_file(extractor, input, output_dir, options);
        if let Err(e) = &result {
            log::error!("Failed to process {}: {}", input.display(), e);
        }
        on_done(input);
        (input.clone(), result)
    };

    let results: Vec<_> = if options.parallel {
        inputs.par_iter().map(process).collect()
    } else {
        inputs.iter().map(process).collect()
    };

    let mut report = BatchReport::default();
    for (input, result) in results {
        match result {
            Ok(output) => report.written.push(output),
            Err(e) => report.failures.push(BatchFailure {
                input,
                error: e.to_string(),
            }),
        }
    }
    Ok(report)
}
