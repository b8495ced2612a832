//! OPF (Open Packaging Format) parser
//!
//! Reads metadata, manifest and spine, and locates the navigation document.

use std::collections::HashMap;

use super::{resolve_path, EpubError};

/// Book metadata needed to identify a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub creators: Vec<String>,
}

impl BookMetadata {
    /// Creators joined with `", "`
    pub fn author(&self) -> String {
        self.creators.join(", ")
    }
}

/// Manifest item with its href resolved to a full archive path
#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub id: String,
    pub path: String,
    pub media_type: String,
    pub properties: Option<String>,
}

/// Location of the table of contents document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocDocument {
    /// EPUB 3 navigation document
    Nav(String),
    /// EPUB 2 NCX
    Ncx(String),
    None,
}

/// Parsed OPF structure
#[derive(Debug, Clone)]
pub struct Package {
    pub metadata: BookMetadata,
    pub manifest: HashMap<String, ManifestItem>,
    /// Full archive paths in reading order
    pub spine: Vec<String>,
    pub toc: TocDocument,
}

/// Parse an OPF document located in `opf_dir`
pub fn parse_opf(content: &str, opf_dir: &str) -> Result<Package, EpubError> {
    let doc = roxmltree::Document::parse(content).map_err(|e| EpubError::XmlError(e.to_string()))?;

    let metadata = parse_metadata(&doc);
    let manifest = parse_manifest(&doc, opf_dir);
    let spine = parse_spine(&doc, &manifest);
    let toc = find_toc_document(&doc, &manifest);

    Ok(Package {
        metadata,
        manifest,
        spine,
        toc,
    })
}

fn parse_metadata(doc: &roxmltree::Document) -> BookMetadata {
    let mut metadata = BookMetadata::default();

    let Some(section) = doc
        .descendants()
        .find(|node| node.tag_name().name() == "metadata")
    else {
        return metadata;
    };

    for node in section.descendants() {
        let Some(text) = node.text().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        match node.tag_name().name() {
            "title" if metadata.title.is_empty() => metadata.title = text.to_string(),
            "creator" => metadata.creators.push(text.to_string()),
            _ => {}
        }
    }

    metadata
}

fn parse_manifest(doc: &roxmltree::Document, opf_dir: &str) -> HashMap<String, ManifestItem> {
    let mut manifest = HashMap::new();

    for node in doc.descendants().filter(|n| n.tag_name().name() == "item") {
        if let (Some(id), Some(href), Some(media_type)) = (
            node.attribute("id"),
            node.attribute("href"),
            node.attribute("media-type"),
        ) {
            manifest.insert(
                id.to_string(),
                ManifestItem {
                    id: id.to_string(),
                    path: resolve_path(opf_dir, href),
                    media_type: media_type.to_string(),
                    properties: node.attribute("properties").map(str::to_string),
                },
            );
        }
    }

    manifest
}

fn parse_spine(doc: &roxmltree::Document, manifest: &HashMap<String, ManifestItem>) -> Vec<String> {
    doc.descendants()
        .filter(|n| n.tag_name().name() == "itemref")
        .filter_map(|n| n.attribute("idref"))
        .filter_map(|idref| manifest.get(idref))
        .map(|item| item.path.clone())
        .collect()
}

/// NAV first, then the NCX named by the spine's `toc` attribute
fn find_toc_document(doc: &roxmltree::Document, manifest: &HashMap<String, ManifestItem>) -> TocDocument {
    let nav = manifest.values().find(|item| {
        item.properties
            .as_deref()
            .map(|props| props.split_whitespace().any(|p| p == "nav"))
            .unwrap_or(false)
    });
    if let Some(item) = nav {
        return TocDocument::Nav(item.path.clone());
    }

    let ncx = doc
        .descendants()
        .find(|n| n.tag_name().name() == "spine")
        .and_then(|spine| spine.attribute("toc"))
        .and_then(|id| manifest.get(id))
        .or_else(|| {
            manifest
                .values()
                .find(|item| item.media_type == "application/x-dtbncx+xml")
        });

    match ncx {
        Some(item) => TocDocument::Ncx(item.path.clone()),
        None => TocDocument::None,
    }
}
