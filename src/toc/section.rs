//! Section tree types

use serde::{Deserialize, Serialize};

/// Index of a section within its `SectionTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub usize);

/// Where a TOC entry points to inside an EPUB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAnchor {
    /// Spine document, 1-based (matches KOReader `DocFragment[N]`)
    pub fragment: u32,
    /// Element id from the href fragment (`chapter.xhtml#id`)
    pub id: Option<String>,
}

/// A chapter or sub-chapter of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    /// 1 is the top of the hierarchy
    pub level: u32,
    /// Ordering key relative to the document start
    pub location: usize,
    pub parent: Option<SectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<SectionAnchor>,
}

/// Arena of sections in TOC order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionTree {
    sections: Vec<Section>,
}

impl SectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section. The parent, if any, must already be in the tree.
    pub fn push(&mut self, section: Section) -> SectionId {
        debug_assert!(section.parent.map_or(true, |p| p.0 < self.sections.len()));
        self.sections.push(section);
        SectionId(self.sections.len() - 1)
    }

    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in TOC order
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.sections
            .iter()
            .enumerate()
            .map(|(index, section)| (SectionId(index), section))
    }

    /// Section ids ordered by location; ties keep TOC order
    pub fn sorted_by_location(&self) -> Vec<SectionId> {
        let mut ids: Vec<SectionId> = (0..self.sections.len()).map(SectionId).collect();
        ids.sort_by_key(|id| self.sections[id.0].location);
        ids
    }

    pub fn parent(&self, id: SectionId) -> Option<SectionId> {
        self.get(id).and_then(|section| section.parent)
    }

    /// Ancestors of `id` from the root down to `id` itself
    pub fn path(&self, id: SectionId) -> Vec<SectionId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(section_id) = current {
            if self.get(section_id).is_none() {
                break;
            }
            path.push(section_id);
            current = self.parent(section_id);
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str, level: u32, location: usize, parent: Option<SectionId>) -> Section {
        Section {
            title: title.to_string(),
            level,
            location,
            parent,
            anchor: None,
        }
    }

    #[test]
    fn test_path_from_root() {
        let mut tree = SectionTree::new();
        let part = tree.push(section("Part", 1, 0, None));
        let chapter = tree.push(section("Chapter", 2, 10, Some(part)));
        let scene = tree.push(section("Scene", 3, 20, Some(chapter)));

        assert_eq!(tree.path(scene), vec![part, chapter, scene]);
        assert_eq!(tree.path(part), vec![part]);
    }

    #[test]
    fn test_sorted_by_location_is_stable() {
        let mut tree = SectionTree::new();
        let late = tree.push(section("Late", 1, 500, None));
        let zero_a = tree.push(section("A", 1, 0, None));
        let zero_b = tree.push(section("B", 1, 0, None));

        assert_eq!(tree.sorted_by_location(), vec![zero_a, zero_b, late]);
    }

    #[test]
    fn test_serializes_as_flat_array() {
        let mut tree = SectionTree::new();
        let part = tree.push(section("Part", 1, 0, None));
        tree.push(section("Chapter", 2, 10, Some(part)));

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"[{"title":"Part","level":1,"location":0,"parent":null},{"title":"Chapter","level":2,"location":10,"parent":0}]"#
        );

        let parsed: SectionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tree);
    }
}
