//! PDF input detection.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// PDF header marker.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers accept the header anywhere in the first kilobyte of the file.
const HEADER_WINDOW: usize = 1024;

/// Header information of a PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Declared version (e.g., "1.7")
    pub version: String,
    /// Byte offset of the `%PDF-` marker
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// Read and validate the header of a file.
pub fn detect_header_from_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let mut file = File::open(path)?;
    let mut head = Vec::with_capacity(HEADER_WINDOW);
    file.by_ref()
        .take(HEADER_WINDOW as u64)
        .read_to_end(&mut head)?;
    detect_header(&head)
}

/// Validate the header of an in-memory document.
pub fn detect_header(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version: String = window[offset + PDF_MAGIC.len()..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version, offset })
}

/// Versions look like "1.4" or "2.0".
fn is_valid_version(version: &str) -> bool {
    match version.split_once('.') {
        Some((major, minor)) => {
            matches!(major, "1" | "2")
                && minor.len() == 1
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Whether a path has a `.pdf` extension, in any letter case.
pub fn has_pdf_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
