//! Section lookup for annotations the text search could not place

use crate::document::Annotation;
use crate::location::Location;
use crate::toc::{SectionId, SectionTree};

/// One way of finding the section an annotation belongs to
pub trait SectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, annotation: &Annotation, sections: &SectionTree) -> Option<SectionId>;
}

/// Match the annotation's EPUB document fragment against TOC anchors.
///
/// A section whose anchor id appears in the annotation xpath wins; otherwise
/// the first section pointing into the same fragment.
pub struct AnchorStrategy;

impl SectionStrategy for AnchorStrategy {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn resolve(&self, annotation: &Annotation, sections: &SectionTree) -> Option<SectionId> {
        let Ok(Location::EpubXPath(location)) = annotation.context.serialized_location.parse::<Location>() else {
            return None;
        };
        let fragment = location.start.document_fragment_id;
        let xpath = &location.start.xpath;

        let mut first = None;
        for (id, section) in sections.iter() {
            let Some(anchor) = &section.anchor else {
                continue;
            };
            if anchor.fragment != fragment {
                continue;
            }
            if let Some(element) = &anchor.id {
                if xpath.contains(&format!("\"{}\"", element)) || xpath.contains(&format!("'{}'", element)) {
                    return Some(id);
                }
            }
            first.get_or_insert(id);
        }
        first
    }
}

/// Case-insensitive substring match between the source's chapter title and
/// section titles
pub struct TitleStrategy;

impl SectionStrategy for TitleStrategy {
    fn name(&self) -> &'static str {
        "title"
    }

    fn resolve(&self, annotation: &Annotation, sections: &SectionTree) -> Option<SectionId> {
        let chapter = annotation.context.chapter.as_deref()?.trim().to_lowercase();
        if chapter.is_empty() {
            return None;
        }

        sections
            .iter()
            .find(|(_, section)| {
                let title = section.title.trim().to_lowercase();
                !title.is_empty() && (title.contains(&chapter) || chapter.contains(&title))
            })
            .map(|(id, _)| id)
    }
}

/// First section found by `strategies`, tried in order
pub fn resolve_section(
    strategies: &[Box<dyn SectionStrategy>],
    annotation: &Annotation,
    sections: &SectionTree,
) -> Option<SectionId> {
    strategies.iter().find_map(|strategy| {
        let found = strategy.resolve(annotation, sections);
        if found.is_some() {
            tracing::debug!(strategy = strategy.name(), "resolved section");
        }
        found
    })
}
