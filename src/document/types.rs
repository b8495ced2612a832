//! Core annotation and document types

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::DocumentReference;
use crate::toc::{SectionId, SectionTree};

/// Page number used when the annotation source did not report one
pub const NO_PAGE: i32 = -1;

/// Kind of annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    /// Highlighted text in a document
    Highlight,
    /// User provided comment attached to a highlight
    Note,
}

/// Where an annotation sits within its document.
///
/// Sources fill `serialized_location`, `page_number` and sometimes
/// `chapter`; the alignment engine fills `content`, `section` and
/// `location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationContext {
    /// Markup block surrounding the annotation
    pub content: Option<String>,
    /// Enclosing section in the owning document's tree
    pub section: Option<SectionId>,
    /// Chapter title reported by the annotation source
    pub chapter: Option<String>,
    /// Position relative to the document start, used for sort order
    pub location: i64,
    /// Position token as supplied by the annotation source
    pub serialized_location: String,
    /// Page containing the annotation, `NO_PAGE` if unknown
    pub page_number: i32,
}

impl Default for AnnotationContext {
    fn default() -> Self {
        Self {
            content: None,
            section: None,
            chapter: None,
            location: 0,
            serialized_location: String::new(),
            page_number: NO_PAGE,
        }
    }
}

impl AnnotationContext {
    pub fn new(serialized_location: impl Into<String>, page_number: i32) -> Self {
        Self {
            serialized_location: serialized_location.into(),
            page_number,
            ..Default::default()
        }
    }
}

/// A highlight or note captured by a reading device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub content: String,
    pub document: DocumentReference,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    pub context: AnnotationContext,
    pub created_date: NaiveDateTime,
}

impl Annotation {
    pub fn new(
        content: impl Into<String>,
        document: DocumentReference,
        kind: AnnotationType,
        context: AnnotationContext,
        created_date: NaiveDateTime,
    ) -> Self {
        Self {
            content: content.into(),
            document,
            kind,
            context,
            created_date,
        }
    }

    /// Whether the alignment engine found this annotation in the document
    pub fn is_aligned(&self) -> bool {
        self.context.content.is_some()
    }
}

/// A non-empty run of text in a document, in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    /// Text as it appears in the source, entities not yet decoded
    pub text: String,
    /// Absolute offset of the fragment from the document start
    pub offset: usize,
    /// Inner markup of the element that contains the fragment
    pub parent_markup: String,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, offset: usize, parent_markup: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset,
            parent_markup: parent_markup.into(),
        }
    }
}

/// Output of a document reader: everything the alignment engine needs
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub reference: DocumentReference,
    pub fragments: Vec<TextFragment>,
    pub sections: SectionTree,
}

/// Earliest and latest annotation dates of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSpan {
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

impl DateSpan {
    pub fn at(date: NaiveDateTime) -> Self {
        Self {
            created: date,
            modified: date,
        }
    }

    /// Smallest span covering both
    pub fn union(self, other: DateSpan) -> Self {
        Self {
            created: self.created.min(other.created),
            modified: self.modified.max(other.modified),
        }
    }
}

/// An aligned document ready to be written
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub reference: DocumentReference,
    pub source: Option<PathBuf>,
    pub sections: SectionTree,
    pub annotations: Vec<Annotation>,
    pub dates: Option<DateSpan>,
}
