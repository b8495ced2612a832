//! Flattened document text with offset maps

use tracing::debug;

use crate::document::TextFragment;
use crate::toc::{SectionId, SectionTree};

/// Index of the greatest key `<= value`, or `None` if every key is larger.
///
/// `keys` must be sorted ascending.
pub fn floor_index(keys: &[usize], value: usize) -> Option<usize> {
    keys.partition_point(|&key| key <= value).checked_sub(1)
}

/// Index of the greatest key `<= value`, or 0 if `value` is smaller than
/// every key.
pub fn lower_bound(keys: &[usize], value: usize) -> usize {
    floor_index(keys, value).unwrap_or(0)
}

/// Document text flattened into a single searchable buffer
#[derive(Debug)]
pub struct TextIndex<'a> {
    buffer: String,
    fragments: &'a [TextFragment],
    /// Buffer offset where each retained fragment starts
    fragment_starts: Vec<usize>,
    /// Position of each retained fragment in `fragments`
    fragment_indexes: Vec<usize>,
    /// Buffer offset where each recorded section starts
    section_starts: Vec<usize>,
    section_ids: Vec<SectionId>,
}

impl<'a> TextIndex<'a> {
    pub fn build(fragments: &'a [TextFragment], sections: &SectionTree) -> Self {
        // On a tie the anchored section is consumed last so it wins
        let mut pending = sections.sorted_by_location();
        pending.sort_by_key(|&id| sections.get(id).map(|s| (s.location, s.anchor.is_some())));
        let mut next_section = 0;

        let mut index = Self {
            buffer: String::new(),
            fragments,
            fragment_starts: Vec::with_capacity(fragments.len()),
            fragment_indexes: Vec::with_capacity(fragments.len()),
            section_starts: Vec::new(),
            section_ids: Vec::new(),
        };

        for (position, fragment) in fragments.iter().enumerate() {
            let decoded = html_escape::decode_html_entities(&fragment.text);
            let text = decoded.trim();
            if text.is_empty() {
                continue;
            }

            let start = index.buffer.len();

            while let Some(&id) = pending.get(next_section) {
                let Some(section) = sections.get(id) else {
                    break;
                };
                if section.location > fragment.offset {
                    break;
                }
                index.record_section(start, id);
                next_section += 1;
            }

            index.buffer.push_str(text);
            index.buffer.push(' ');
            index.fragment_starts.push(start);
            index.fragment_indexes.push(position);
        }

        debug!(
            fragments = index.fragment_starts.len(),
            sections = index.section_starts.len(),
            bytes = index.buffer.len(),
            "built text index"
        );

        index
    }

    /// Sections crossed by the same fragment share its start; the last one wins
    fn record_section(&mut self, start: usize, id: SectionId) {
        if self.section_starts.last() == Some(&start) {
            if let Some(last) = self.section_ids.last_mut() {
                *last = id;
            }
        } else {
            self.section_starts.push(start);
            self.section_ids.push(id);
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn fragment_starts(&self) -> &[usize] {
        &self.fragment_starts
    }

    /// Number of fragments that made it into the buffer
    pub fn len(&self) -> usize {
        self.fragment_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment_starts.is_empty()
    }

    /// Slot of the retained fragment covering buffer offset `at`
    pub fn slot_at(&self, at: usize) -> Option<usize> {
        if self.fragment_starts.is_empty() {
            return None;
        }
        Some(lower_bound(&self.fragment_starts, at))
    }

    /// Source position of the fragment held in `slot`
    pub fn position(&self, slot: usize) -> Option<usize> {
        self.fragment_indexes.get(slot).copied()
    }

    pub fn fragment(&self, slot: usize) -> Option<&'a TextFragment> {
        self.position(slot).and_then(|position| self.fragments.get(position))
    }

    /// Retained fragments in slots `first..=last`
    pub fn fragments_between(&self, first: usize, last: usize) -> impl Iterator<Item = &'a TextFragment> + '_ {
        let last = last.min(self.fragment_indexes.len().saturating_sub(1));
        self.fragment_indexes
            .get(first..=last)
            .unwrap_or_default()
            .iter()
            .filter_map(|&position| self.fragments.get(position))
    }

    /// Section starting at or before buffer offset `at`
    pub fn section_at(&self, at: usize) -> Option<SectionId> {
        floor_index(&self.section_starts, at).map(|i| self.section_ids[i])
    }
}
