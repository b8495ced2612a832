//! Document and annotation model
//!
//! Format-agnostic types shared by readers, annotation providers, the
//! alignment engine and writers.
//!
//! # Ownership
//!
//! ```text
//! Document ──owns──▶ SectionTree ──arena──▶ Section { parent: SectionId }
//!    │
//!    └──owns──▶ Annotation ──▶ AnnotationContext { section: SectionId }
//! ```
//!
//! Annotations never own sections; they hold an index into the tree of
//! the document they were aligned against.

mod reference;
mod types;

pub use reference::DocumentReference;
pub use types::{
    Annotation, AnnotationContext, AnnotationType, DateSpan, Document, ParsedDocument,
    TextFragment, NO_PAGE,
};
