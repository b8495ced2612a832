//! Document writers
//!
//! Writers turn an aligned `Document` into a file format. Only markdown is
//! built in; the trait keeps the workflow independent of the format.

mod markdown;

use std::io::Write;

use crate::document::Document;
use crate::error::Result;

pub use markdown::MarkdownWriter;

/// Serializes an aligned document
pub trait DocumentWriter: Send + Sync {
    /// Extension of produced files, without the dot
    fn file_extension(&self) -> &'static str;

    fn write(&self, document: &Document, out: &mut dyn Write) -> Result<()>;

    /// Render into memory
    fn render(&self, document: &Document) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(document, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
