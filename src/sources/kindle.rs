//! Kindle `My Clippings.txt`
//!
//! ```text
//! The Design of Everyday Things (Norman, Don)
//! - Your Highlight on page 145 | Location 3015-3016 | Added on Thursday, August 15, 2019 10:14:40 AM
//!
//! Forcing functions can be a nuisance in normal usage.
//! ==========
//! ```

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AnnotationProvider;
use crate::document::{Annotation, AnnotationContext, AnnotationType, DocumentReference, NO_PAGE};
use crate::error::Result;
use crate::location::LineLocation;

pub const CLIPPINGS_FILE: &str = "My Clippings.txt";

/// Line that ends every clipping
pub const END_MARKER: &str = "==========";

const DATE_FORMAT: &str = "%A, %B %d, %Y %I:%M:%S %p";

static BOOK_INFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\u{feff}?(?P<title>.*)\s\((?P<author>.*)\)$").unwrap());

static ANNOTATION_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^- Your (?P<kind>\w+) (?:on page (?P<page>\d+) \| )?(?:on )?(?i:location) (?P<start>\d+)(?:-(?P<end>\d+))? \| Added on (?P<date>.+)$",
    )
    .unwrap()
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClippingError {
    #[error("Book information line doesn't match: {0}")]
    InvalidBookInfo(String),

    #[error("Annotation information line doesn't match: {0}")]
    InvalidAnnotationInfo(String),

    #[error("Expected blank line, found: {0}")]
    MissingBlankLine(String),

    #[error("Unknown clipping type: {0}")]
    UnknownType(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClippingType {
    Highlight,
    Note,
    Bookmark,
}

/// One entry of the clippings file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clipping {
    pub title: String,
    pub author: String,
    pub kind: ClippingType,
    pub page: Option<i32>,
    pub location: LineLocation,
    pub created: NaiveDateTime,
    pub content: String,
}

impl Clipping {
    /// `None` for bookmarks, which have no text
    pub fn into_annotation(self) -> Option<Annotation> {
        let kind = match self.kind {
            ClippingType::Highlight => AnnotationType::Highlight,
            ClippingType::Note => AnnotationType::Note,
            ClippingType::Bookmark => return None,
        };

        let mut context = AnnotationContext::new(self.location.to_string(), self.page.unwrap_or(NO_PAGE));
        context.location = i64::from(self.location.start);

        Some(Annotation::new(
            self.content,
            DocumentReference::new(self.title, self.author),
            kind,
            context,
            self.created,
        ))
    }
}

/// Parse every block of a clippings file
pub fn parse_clippings(content: &str) -> Vec<std::result::Result<Clipping, ClippingError>> {
    let mut clippings = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in content.lines().map(|l| l.trim_end_matches('\r')) {
        if line.trim() == END_MARKER {
            if block.iter().any(|l| !l.trim().is_empty()) {
                clippings.push(parse_block(&block));
            }
            block.clear();
        } else {
            block.push(line);
        }
    }
    if block.iter().any(|l| !l.trim().is_empty()) {
        clippings.push(parse_block(&block));
    }

    clippings
}

fn parse_block(lines: &[&str]) -> std::result::Result<Clipping, ClippingError> {
    let mut lines = lines.iter().skip_while(|l| l.trim().is_empty()).copied();

    let book_line = lines.next().unwrap_or_default();
    let book = BOOK_INFO
        .captures(book_line)
        .ok_or_else(|| ClippingError::InvalidBookInfo(book_line.to_string()))?;

    let info_line = lines.next().unwrap_or_default();
    let info = ANNOTATION_INFO
        .captures(info_line.trim())
        .ok_or_else(|| ClippingError::InvalidAnnotationInfo(info_line.to_string()))?;

    let blank = lines.next().unwrap_or_default();
    if !blank.trim().is_empty() {
        return Err(ClippingError::MissingBlankLine(blank.to_string()));
    }

    let kind = match &info["kind"] {
        "Highlight" => ClippingType::Highlight,
        "Note" => ClippingType::Note,
        "Bookmark" => ClippingType::Bookmark,
        other => return Err(ClippingError::UnknownType(other.to_string())),
    };

    let number = |s: &str| s.parse::<u32>().map_err(|_| ClippingError::InvalidNumber(s.to_string()));
    let start = number(&info["start"])?;
    let end = match info.name("end") {
        Some(end) => number(end.as_str())?,
        None => start,
    };
    let page = match info.name("page") {
        Some(page) => Some(
            page.as_str()
                .parse::<i32>()
                .map_err(|_| ClippingError::InvalidNumber(page.as_str().to_string()))?,
        ),
        None => None,
    };

    let date = info["date"].trim();
    let created = NaiveDateTime::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| ClippingError::InvalidDate(date.to_string()))?;

    let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    Ok(Clipping {
        title: book["title"].trim().to_string(),
        author: book["author"].trim().to_string(),
        kind,
        page,
        location: LineLocation::new(start, end),
        created,
        content,
    })
}

/// Reads `My Clippings.txt` from a library directory
#[derive(Debug, Default, Clone, Copy)]
pub struct ClippingProvider;

impl ClippingProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AnnotationProvider for ClippingProvider {
    fn name(&self) -> &'static str {
        "kindle"
    }

    fn is_available(&self, source: &Path) -> bool {
        source.is_dir() && source.join(CLIPPINGS_FILE).is_file()
    }

    fn annotations(&self, source: &Path) -> Result<Vec<Annotation>> {
        if !self.is_available(source) {
            return Ok(Vec::new());
        }

        let path = source.join(CLIPPINGS_FILE);
        let bytes = fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes);

        let mut annotations = Vec::new();
        let mut skipped = 0;
        for clipping in parse_clippings(&content) {
            match clipping {
                Ok(clipping) => {
                    if let Some(annotation) = clipping.into_annotation() {
                        annotations.push(annotation);
                    }
                }
                Err(e) => {
                    warn!("Skipping clipping in {}: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }

        debug!(skipped, "parsed clippings");
        info!("Found {} Kindle annotations in {}", annotations.len(), path.display());
        Ok(annotations)
    }
}
