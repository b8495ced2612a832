//! Marginalia Library
//!
//! Extracts highlights and notes recorded by e-readers and realigns them
//! with the source document to recover their paragraph, section and page.
//! The command line front-end is in main.rs.
//!
//! # Modules
//!
//! - `document`: Document references, annotations and text fragments
//! - `location`: Serialized location codecs (line ranges, EPUB xpaths)
//! - `toc`: Table of contents to section tree builder
//! - `align`: Annotation to document text alignment engine
//! - `formats`: Format-specific document readers (EPUB)
//! - `sources`: Annotation providers (Kindle, KOReader)
//! - `render`: Document writers (markdown)
//! - `workflow`: End-to-end extraction over a file or a library

pub mod align;
pub mod config;
pub mod document;
pub mod error;
pub mod formats;
pub mod location;
pub mod render;
pub mod sources;
pub mod toc;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, Result};
