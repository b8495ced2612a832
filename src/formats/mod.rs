//! Document formats
//!
//! A reader turns a document file into the flattened text fragments and
//! table of contents the alignment engine works on.

pub mod epub;

use std::path::Path;

use crate::document::{DocumentReference, ParsedDocument};
use crate::error::Result;

pub use epub::{EpubError, EpubReader};

/// Reads one document format
pub trait DocumentReader: Send + Sync {
    /// File extensions handled by this reader, lowercase, without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// Title and author only, without reading the content
    fn reference(&self, bytes: &[u8]) -> Result<DocumentReference>;

    /// Full parse: reference, text fragments and sections
    fn read(&self, bytes: &[u8]) -> Result<ParsedDocument>;

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Readers for every supported format
pub fn readers() -> Vec<Box<dyn DocumentReader>> {
    vec![Box::new(EpubReader::new())]
}

/// Extensions across all readers
pub fn supported_extensions(readers: &[Box<dyn DocumentReader>]) -> Vec<&'static str> {
    readers.iter().flat_map(|r| r.extensions().iter().copied()).collect()
}
