//! EPUB reader
//!
//! ```text
//! META-INF/container.xml ──► content.opf ──┬─► metadata   → DocumentReference
//!                                          ├─► spine      → TextFragments
//!                                          └─► nav / ncx  → SectionTree
//! ```
//!
//! Spine documents are laid end to end: a fragment's offset is the length of
//! all previous spine documents plus its byte position in its own document.
//! Table of contents links resolve to the offset of their target element.

mod content;
mod nav;
mod opf;

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

pub use content::{parse_content_document, ContentDocument};
pub use nav::{parse_nav_document, parse_ncx_document, NavLink};
pub use opf::{parse_opf, BookMetadata, ManifestItem, Package, TocDocument};

use super::DocumentReader;
use crate::document::{DocumentReference, ParsedDocument};
use crate::toc::{LocationMode, SectionAnchor, SectionTreeBuilder, TocEntry};

#[derive(Error, Debug)]
pub enum EpubError {
    #[error("Failed to read ZIP archive: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("XML parse error: {0}")]
    XmlError(String),
}

static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Replace HTML named entities that XML does not define with numeric
/// references. Unknown names are escaped so the document still parses.
pub fn normalize_entities(content: &str) -> Cow<'_, str> {
    NAMED_ENTITY.replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        if XML_ENTITIES.contains(&name) {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            return format!("&amp;{};", name);
        }
        decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
    })
}

/// Parse XHTML, tolerating a DOCTYPE declaration
pub fn parse_markup(text: &str) -> Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options)
}

/// Join `href` onto `base_dir`, resolving `.` and `..` segments
pub fn resolve_path(base_dir: &str, href: &str) -> String {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// An opened EPUB archive
pub struct EpubArchive<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    pub package: Package,
}

impl<'a> EpubArchive<'a> {
    pub fn open(data: &'a [u8]) -> Result<Self, EpubError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let opf_path = Self::find_opf_path(&mut archive)?;
        let opf_content = read_file(&mut archive, &opf_path)?;
        let package = parse_opf(&opf_content, parent_dir(&opf_path))?;

        Ok(Self { archive, package })
    }

    fn find_opf_path(archive: &mut ZipArchive<Cursor<&'a [u8]>>) -> Result<String, EpubError> {
        let container = read_file(archive, "META-INF/container.xml")?;
        let doc = roxmltree::Document::parse(&container).map_err(|e| EpubError::XmlError(e.to_string()))?;

        doc.descendants()
            .find(|n| n.tag_name().name() == "rootfile")
            .and_then(|n| n.attribute("full-path"))
            .map(str::to_string)
            .ok_or_else(|| EpubError::InvalidEpub("Could not find OPF path in container.xml".to_string()))
    }

    pub fn reference(&self) -> DocumentReference {
        DocumentReference::new(self.package.metadata.title.clone(), self.package.metadata.author())
    }

    pub fn read_file(&mut self, path: &str) -> Result<String, EpubError> {
        read_file(&mut self.archive, path)
    }

    /// Table of contents links, empty if the book has none
    pub fn nav_links(&mut self) -> Vec<NavLink> {
        let (path, is_nav) = match &self.package.toc {
            TocDocument::Nav(path) => (path.clone(), true),
            TocDocument::Ncx(path) => (path.clone(), false),
            TocDocument::None => return Vec::new(),
        };

        let content = match self.read_file(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read navigation document {}: {}", path, e);
                return Vec::new();
            }
        };

        if is_nav {
            parse_nav_document(&content, parent_dir(&path))
        } else {
            parse_ncx_document(&content, parent_dir(&path))
        }
    }
}

fn read_file(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<String, EpubError> {
    let mut file = archive.by_name(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Reads `.epub` files
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubReader;

impl EpubReader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument, EpubError> {
        let mut epub = EpubArchive::open(bytes)?;
        let reference = epub.reference();

        let spine = epub.package.spine.clone();
        let mut fragments = Vec::new();
        let mut bases: HashMap<String, (usize, u32)> = HashMap::new();
        let mut anchors: HashMap<(String, String), usize> = HashMap::new();
        let mut base = 0;

        for (index, path) in spine.iter().enumerate() {
            let content = epub.read_file(path)?;
            let document = parse_content_document(&content, base)?;
            debug!(path = %path, base, fragments = document.fragments.len(), "spine document");

            bases.entry(path.clone()).or_insert((base, index as u32 + 1));
            for (id, offset) in document.anchors {
                anchors.insert((path.clone(), id), offset);
            }
            fragments.extend(document.fragments);
            base += document.len;
        }

        let entries = epub.nav_links().into_iter().map(|link| {
            let Some(&(doc_base, fragment)) = bases.get(&link.path) else {
                return TocEntry::new(link.title, link.depth, Some(0));
            };
            let offset = link
                .fragment
                .as_ref()
                .and_then(|id| anchors.get(&(link.path.clone(), id.clone())))
                .copied()
                .unwrap_or(doc_base);
            TocEntry::new(link.title, link.depth, Some(offset)).with_anchor(SectionAnchor {
                fragment,
                id: link.fragment,
            })
        });
        let sections = SectionTreeBuilder::from_entries(LocationMode::Literal, entries);

        debug!(
            title = %reference.title,
            fragments = fragments.len(),
            sections = sections.len(),
            "parsed epub"
        );

        Ok(ParsedDocument {
            reference,
            fragments,
            sections,
        })
    }
}

impl DocumentReader for EpubReader {
    fn extensions(&self) -> &'static [&'static str] {
        &["epub"]
    }

    fn reference(&self, bytes: &[u8]) -> crate::Result<DocumentReference> {
        Ok(EpubArchive::open(bytes)?.reference())
    }

    fn read(&self, bytes: &[u8]) -> crate::Result<ParsedDocument> {
        Ok(self.parse(bytes)?)
    }
}
