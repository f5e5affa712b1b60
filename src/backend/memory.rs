//! In-memory backend over pre-extracted pages.
//!
//! Useful when spans come from another extractor (serialised as JSON) and
//! for driving the pipeline without a PDF file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{DocumentBackend, RawPage};
use crate::error::{Error, Result};

/// A document held as a list of raw pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryBackend {
    #[serde(default)]
    title: Option<String>,
    pages: Vec<RawPage>,
    /// Password that unlocks the document; `None` means not encrypted
    #[serde(skip)]
    password: Option<String>,
    #[serde(skip)]
    unlocked: bool,
}

impl MemoryBackend {
    /// Create a backend over the given pages.
    pub fn new(pages: Vec<RawPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Set the metadata title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Lock the document behind a password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self.unlocked = false;
        self
    }

    /// Load pages from a JSON dump: `{"title": ..., "pages": [RawPage, ...]}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| Error::PdfParse(e.to_string()))
    }
}

impl DocumentBackend for MemoryBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, number: u32) -> Result<RawPage> {
        if self.is_encrypted() {
            return Err(Error::Encrypted);
        }
        let count = self.page_count();
        if number == 0 || number > count {
            return Err(Error::PageOutOfRange(number, count));
        }
        Ok(self.pages[(number - 1) as usize].clone())
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn is_encrypted(&self) -> bool {
        self.password.is_some() && !self.unlocked
    }

    fn authenticate(&mut self, password: &str) -> bool {
        match &self.password {
            Some(expected) if expected == password => {
                self.unlocked = true;
                true
            }
            Some(_) => false,
            None => true,
        }
    }
}
