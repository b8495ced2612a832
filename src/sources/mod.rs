//! Annotation sources
//!
//! Providers read highlights and notes exported by reading devices. Each
//! annotation carries its document reference and a serialized location in
//! the provider's own scheme.
//!
//! | Provider | Input                          | Location scheme  |
//! |----------|--------------------------------|------------------|
//! | Kindle   | `My Clippings.txt`             | `line://A-B`     |
//! | KOReader | `*.sdr/metadata.*.lua` sidecar | EPUB xpath range |

pub mod kindle;
pub mod koreader;

use std::path::Path;

use crate::document::Annotation;
use crate::error::Result;

pub use kindle::{ClippingError, ClippingProvider};
pub use koreader::{KoReaderProvider, LuaParseError};

/// Reads annotations stored alongside a library
pub trait AnnotationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `source` holds annotations this provider understands
    fn is_available(&self, source: &Path) -> bool;

    /// All annotations under `source`. Malformed entries are logged and
    /// skipped; only unreadable input is an error.
    fn annotations(&self, source: &Path) -> Result<Vec<Annotation>>;
}

/// Every built-in provider
pub fn providers() -> Vec<Box<dyn AnnotationProvider>> {
    vec![Box::new(ClippingProvider::new()), Box::new(KoReaderProvider::new())]
}
