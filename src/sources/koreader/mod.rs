//! KOReader sidecar metadata
//!
//! KOReader keeps highlights in `<book>.sdr/metadata.<ext>.lua` next to each
//! book. Two layouts exist:
//!
//! ```text
//! legacy                                   current
//! bookmarks[n] = {                         annotations[n] = {
//!     highlighted = true,                      pos0, pos1,
//!     notes = <highlighted text>,              text = <highlighted text>,
//!     text  = <user note>,                     note = <user note>,
//!     pos0, pos1, chapter, datetime,           pageno, chapter, datetime,
//! }                                        }
//! highlight[page][seq] = { pos0, ... }
//! ```

mod lua;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

pub use lua::{parse_chunk, parse_value, LuaKey, LuaParseError, LuaTable, LuaValue};

use super::AnnotationProvider;
use crate::document::{Annotation, AnnotationContext, AnnotationType, DocumentReference};
use crate::error::Result;
use crate::location::EpubXPathLocation;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Notes starting with this prefix are KOReader's automatic page labels
const PAGE_LABEL_PREFIX: &str = "Page ";

/// Reads KOReader `.lua` sidecar files found under a directory
#[derive(Debug, Default, Clone, Copy)]
pub struct KoReaderProvider;

impl KoReaderProvider {
    pub fn new() -> Self {
        Self
    }

    fn sidecar_files(source: &Path) -> Vec<PathBuf> {
        if source.is_file() {
            return match source.extension().and_then(|e| e.to_str()) {
                Some("lua") => vec![source.to_path_buf()],
                _ => Vec::new(),
            };
        }

        let pattern = format!("{}/**/*.lua", glob::Pattern::escape(&source.to_string_lossy()));
        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
            Err(e) => {
                warn!("Invalid sidecar pattern {}: {}", pattern, e);
                Vec::new()
            }
        }
    }
}

impl AnnotationProvider for KoReaderProvider {
    fn name(&self) -> &'static str {
        "koreader"
    }

    fn is_available(&self, source: &Path) -> bool {
        !Self::sidecar_files(source).is_empty()
    }

    fn annotations(&self, source: &Path) -> Result<Vec<Annotation>> {
        let mut annotations = Vec::new();

        for file in Self::sidecar_files(source) {
            let content = fs::read_to_string(&file)?;
            let root = match parse_chunk(&content) {
                Ok(LuaValue::Table(root)) => root,
                Ok(_) => {
                    warn!("Skipping {}: not a table", file.display());
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    continue;
                }
            };

            let found = annotations_from_table(&root);
            debug!(file = %file.display(), count = found.len(), "read sidecar");
            annotations.extend(found);
        }

        info!("Found {} KOReader annotations under {}", annotations.len(), source.display());
        Ok(annotations)
    }
}

/// Title from `doc_props`, falling back to the file name of `doc_path`
pub fn document_reference(root: &LuaTable) -> DocumentReference {
    let props = root.table("doc_props");
    let title = props
        .and_then(|p| p.str("title"))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            root.str("doc_path")
                .and_then(|p| Path::new(p).file_name())
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let author = props
        .and_then(|p| p.str("authors"))
        .map(|a| a.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(", "))
        .unwrap_or_default();

    DocumentReference::new(title, author)
}

/// Highlights and notes of one sidecar, in either layout
pub fn annotations_from_table(root: &LuaTable) -> Vec<Annotation> {
    let document = document_reference(root);

    if let Some(entries) = root.table("annotations") {
        return current_layout(entries, &document);
    }
    if let Some(bookmarks) = root.table("bookmarks") {
        let pages = highlight_pages(root.table("highlight"));
        return legacy_layout(bookmarks, &pages, &document);
    }
    Vec::new()
}

/// Start xpointer to (page, sequence) from the legacy `highlight` table
fn highlight_pages(highlight: Option<&LuaTable>) -> HashMap<String, (u32, u32)> {
    let mut pages = HashMap::new();
    let Some(highlight) = highlight else {
        return pages;
    };

    for (page, entries) in highlight.sequence() {
        let Some(entries) = entries.as_table() else {
            continue;
        };
        for (sequence, entry) in entries.sequence() {
            let Some(pos0) = entry.as_table().and_then(|e| e.str("pos0")) else {
                continue;
            };
            pages
                .entry(pos0.to_string())
                .or_insert((page.max(0) as u32, sequence.max(0) as u32));
        }
    }
    pages
}

struct Highlight<'a> {
    text: &'a str,
    note: Option<&'a str>,
    pos0: &'a str,
    pos1: &'a str,
    page: u32,
    sequence: u32,
    chapter: Option<&'a str>,
    datetime: Option<&'a str>,
}

impl Highlight<'_> {
    fn into_annotations(self, document: &DocumentReference) -> Vec<Annotation> {
        let location = match EpubXPathLocation::from_positions(self.pos0, self.pos1, self.page, self.sequence) {
            Ok(location) => location,
            Err(e) => {
                warn!("Skipping highlight with invalid position {}: {}", self.pos0, e);
                return Vec::new();
            }
        };
        let Some(created) = self
            .datetime
            .and_then(|d| NaiveDateTime::parse_from_str(d.trim(), DATE_FORMAT).ok())
        else {
            warn!("Skipping highlight at {} without a valid date", self.pos0);
            return Vec::new();
        };

        let mut context = AnnotationContext::new(location.to_string(), self.page as i32);
        context.location = location.ordinal();
        context.chapter = self.chapter.map(str::to_string);

        let mut annotations = vec![Annotation::new(
            self.text,
            document.clone(),
            AnnotationType::Highlight,
            context.clone(),
            created,
        )];

        if let Some(note) = self.note.filter(|n| !n.trim().is_empty()) {
            annotations.push(Annotation::new(note, document.clone(), AnnotationType::Note, context, created));
        }
        annotations
    }
}

fn legacy_layout(
    bookmarks: &LuaTable,
    pages: &HashMap<String, (u32, u32)>,
    document: &DocumentReference,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    for (_, bookmark) in bookmarks.sequence() {
        let Some(bookmark) = bookmark.as_table() else {
            continue;
        };
        if bookmark.get("highlighted").and_then(LuaValue::as_bool) != Some(true) {
            continue;
        }
        let (Some(text), Some(pos0), Some(pos1)) = (bookmark.str("notes"), bookmark.str("pos0"), bookmark.str("pos1"))
        else {
            continue;
        };

        let placed = pages.get(pos0).copied();
        let (page, sequence) = placed.unwrap_or((0, 0));
        let note = bookmark
            .str("text")
            .filter(|t| placed.is_some() && !t.starts_with(PAGE_LABEL_PREFIX));

        annotations.extend(
            Highlight {
                text,
                note,
                pos0,
                pos1,
                page,
                sequence,
                chapter: bookmark.str("chapter"),
                datetime: bookmark.str("datetime"),
            }
            .into_annotations(document),
        );
    }

    annotations
}

fn current_layout(entries: &LuaTable, document: &DocumentReference) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let mut sequences: HashMap<u32, u32> = HashMap::new();

    for (_, entry) in entries.sequence() {
        let Some(entry) = entry.as_table() else {
            continue;
        };
        // Bookmarks carry `page` but no range
        let (Some(pos0), Some(pos1)) = (entry.str("pos0"), entry.str("pos1")) else {
            continue;
        };
        let Some(text) = entry.str("text") else {
            continue;
        };

        let page = entry
            .get("pageno")
            .and_then(LuaValue::as_i64)
            .map(|p| p.max(0) as u32)
            .unwrap_or(0);
        let sequence = sequences.entry(page).or_insert(0);
        *sequence += 1;

        annotations.extend(
            Highlight {
                text,
                note: entry.str("note"),
                pos0,
                pos1,
                page,
                sequence: *sequence,
                chapter: entry.str("chapter"),
                datetime: entry.str("datetime"),
            }
            .into_annotations(document),
        );
    }

    annotations
}
