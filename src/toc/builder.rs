//! Flat TOC entries to section tree

use std::collections::HashMap;

use tracing::debug;

use super::{Section, SectionAnchor, SectionId, SectionTree};

/// Gap between synthetic section locations
pub const SYNTHETIC_LOCATION_STRIDE: usize = 1000;

/// How section locations are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMode {
    /// Use the offset parsed from the source; entries without one get 0
    Literal,
    /// Ignore offsets and number entries `index * 1000` in input order
    Synthetic,
}

/// A TOC entry as found in the source markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    /// Raw nesting depth of the entry in its markup
    pub depth: usize,
    /// Absolute offset of the target, if the source could resolve it
    pub offset: Option<usize>,
    pub anchor: Option<SectionAnchor>,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, depth: usize, offset: Option<usize>) -> Self {
        Self {
            title: title.into(),
            depth,
            offset,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: SectionAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// Builds a `SectionTree` from entries in document order
pub struct SectionTreeBuilder {
    mode: LocationMode,
    levels: HashMap<usize, u32>,
    open: Vec<(u32, SectionId)>,
    tree: SectionTree,
}

impl SectionTreeBuilder {
    pub fn new(mode: LocationMode) -> Self {
        Self {
            mode,
            levels: HashMap::new(),
            open: Vec::new(),
            tree: SectionTree::new(),
        }
    }

    /// Level for a raw depth, assigning the next free level on first sight
    fn level_for(&mut self, depth: usize) -> u32 {
        let next = self.levels.len() as u32 + 1;
        *self.levels.entry(depth).or_insert(next)
    }

    pub fn push(&mut self, entry: TocEntry) -> SectionId {
        let level = self.level_for(entry.depth);

        // Close siblings and deeper sections; the remaining top is the parent
        while let Some(&(open_level, _)) = self.open.last() {
            if open_level >= level {
                self.open.pop();
            } else {
                break;
            }
        }
        let parent = self.open.last().map(|&(_, id)| id);

        let location = match self.mode {
            LocationMode::Literal => entry.offset.unwrap_or(0),
            LocationMode::Synthetic => self.tree.len() * SYNTHETIC_LOCATION_STRIDE,
        };

        debug!(title = %entry.title, depth = entry.depth, level, location, "toc entry");

        let id = self.tree.push(Section {
            title: entry.title,
            level,
            location,
            parent,
            anchor: entry.anchor,
        });
        self.open.push((level, id));
        id
    }

    pub fn build(self) -> SectionTree {
        self.tree
    }

    /// Build a tree from a complete entry list
    pub fn from_entries(mode: LocationMode, entries: impl IntoIterator<Item = TocEntry>) -> SectionTree {
        let mut builder = Self::new(mode);
        for entry in entries {
            builder.push(entry);
        }
        builder.build()
    }
}
