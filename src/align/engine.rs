//! Annotation search over a `TextIndex`

use tracing::{debug, info};

use super::TextIndex;
use crate::document::{Annotation, DateSpan};

/// Where an annotation was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedMatch {
    /// Byte offset of the match in the index buffer
    pub start: usize,
    pub len: usize,
    /// Source positions of the first and last fragments covered
    pub start_fragment: usize,
    pub end_fragment: usize,
}

/// Sequential annotation search with a forward-only cursor
pub struct Aligner<'i, 'a> {
    index: &'i TextIndex<'a>,
    cursor: usize,
}

impl<'i, 'a> Aligner<'i, 'a> {
    pub fn new(index: &'i TextIndex<'a>) -> Self {
        Self { index, cursor: 0 }
    }

    /// Start of the last successful match
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Find `annotation` at or after the cursor and fill in its context.
    ///
    /// Returns `None` and leaves the annotation untouched when the text is
    /// not found.
    pub fn align_one(&mut self, annotation: &mut Annotation) -> Option<AlignedMatch> {
        let needle = annotation.content.trim();
        if needle.is_empty() {
            return None;
        }

        let haystack = self.index.text().get(self.cursor..)?;
        let start = self.cursor + haystack.find(needle)?;
        self.cursor = start;

        let first = self.index.slot_at(start)?;
        let last = self.index.slot_at(start + needle.len())?;

        let mut context = String::new();
        for fragment in self.index.fragments_between(first, last) {
            context.push_str(&fragment.parent_markup);
            context.push('\n');
        }

        let start_fragment = self.index.fragment(first)?;
        annotation.context.location = start_fragment.offset as i64;
        annotation.context.content = Some(context);
        annotation.context.section = self.index.section_at(start);

        Some(AlignedMatch {
            start,
            len: needle.len(),
            start_fragment: self.index.position(first)?,
            end_fragment: self.index.position(last)?,
        })
    }
}

/// Result of aligning a document's annotations
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    /// Same annotations, same order, with context filled where found
    pub annotations: Vec<Annotation>,
    pub matched: usize,
    /// `None` only when there were no annotations
    pub dates: Option<DateSpan>,
}

/// Align annotations against a document in one forward pass.
///
/// Callers sort `annotations` by location first.
pub fn align(index: &TextIndex<'_>, mut annotations: Vec<Annotation>) -> Alignment {
    let mut aligner = Aligner::new(index);
    let mut matched = 0;
    let mut dates: Option<DateSpan> = None;

    for annotation in annotations.iter_mut() {
        match aligner.align_one(annotation) {
            Some(found) => {
                matched += 1;
                debug!(
                    start = found.start,
                    fragments = ?(found.start_fragment, found.end_fragment),
                    "aligned annotation"
                );
            }
            None => {
                debug!(
                    location = %annotation.context.serialized_location,
                    "annotation not found after cursor {}",
                    aligner.cursor()
                );
            }
        }

        let created = DateSpan::at(annotation.created_date);
        dates = Some(dates.map_or(created, |span| span.union(created)));
    }

    info!(
        "Aligned {}/{} annotations against {} fragments",
        matched,
        annotations.len(),
        index.len()
    );

    Alignment {
        annotations,
        matched,
        dates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::document::{AnnotationContext, AnnotationType, DocumentReference, TextFragment};
    use crate::toc::{LocationMode, SectionTree, SectionTreeBuilder, TocEntry};

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn highlight(content: &str, created: NaiveDateTime) -> Annotation {
        Annotation::new(
            content,
            DocumentReference::new("Book", "Author"),
            AnnotationType::Highlight,
            AnnotationContext::new("line://1-2", 3),
            created,
        )
    }

    fn scenario() -> Vec<TextFragment> {
        vec![
            TextFragment::new("Hello", 0, "<b>Hello</b>"),
            TextFragment::new("world", 6, "<i>world</i>"),
            TextFragment::new("foo bar baz", 12, "foo bar baz"),
        ]
    }

    #[test]
    fn test_match_spans_fragments() {
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &SectionTree::new());
        let mut aligner = Aligner::new(&index);

        let mut annotation = highlight("world foo", date(2020, 1, 1));
        let found = aligner.align_one(&mut annotation).unwrap();

        assert_eq!(found.start, 6);
        assert_eq!(found.len, 9);
        assert_eq!(found.start_fragment, 1);
        assert_eq!(found.end_fragment, 2);

        assert_eq!(annotation.context.location, 6);
        assert_eq!(
            annotation.context.content.as_deref(),
            Some("<i>world</i>\nfoo bar baz\n")
        );
        assert_eq!(annotation.context.page_number, 3);
    }

    #[test]
    fn test_unmatched_annotation_untouched() {
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &SectionTree::new());

        let original = highlight("not in this book", date(2020, 1, 1));
        let mut annotation = original.clone();
        let mut aligner = Aligner::new(&index);

        assert_eq!(aligner.align_one(&mut annotation), None);
        assert_eq!(annotation, original);
        assert_eq!(annotation.context.content, None);
        assert_eq!(aligner.cursor(), 0);
    }

    #[test]
    fn test_content_is_trimmed_before_search() {
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &SectionTree::new());
        let mut annotation = highlight("  bar baz \n", date(2020, 1, 1));

        let found = Aligner::new(&index).align_one(&mut annotation).unwrap();
        assert_eq!(found.start, 16);
        assert_eq!(annotation.context.location, 12);
    }

    #[test]
    fn test_cursor_never_regresses() {
        let fragments = vec![
            TextFragment::new("the cat sat", 0, "a"),
            TextFragment::new("on the mat", 100, "b"),
            TextFragment::new("the cat ran", 200, "c"),
        ];
        let index = TextIndex::build(&fragments, &SectionTree::new());

        let annotations = vec![
            highlight("the cat", date(2020, 1, 1)),
            highlight("the mat", date(2020, 1, 2)),
            // Earlier than the previous match: skipped rather than rewinding
            highlight("cat sat", date(2020, 1, 3)),
            highlight("the cat ran", date(2020, 1, 4)),
        ];

        let mut aligner = Aligner::new(&index);
        let mut starts = Vec::new();
        let mut annotations = annotations;
        for annotation in annotations.iter_mut() {
            let before = aligner.cursor();
            if let Some(found) = aligner.align_one(annotation) {
                assert!(found.start >= before);
                starts.push(found.start);
            }
            assert!(aligner.cursor() >= before);
        }

        assert_eq!(starts, vec![0, 15, 23]);
        assert!(!annotations[2].is_aligned());
    }

    #[test]
    fn test_repeated_text_advances_to_next_occurrence() {
        let fragments = vec![
            TextFragment::new("echo", 0, "first"),
            TextFragment::new("echo", 10, "second"),
        ];
        let index = TextIndex::build(&fragments, &SectionTree::new());

        let alignment = align(
            &index,
            vec![highlight("echo", date(2020, 1, 1)), highlight("o echo", date(2020, 1, 1))],
        );

        assert_eq!(alignment.matched, 2);
        assert_eq!(alignment.annotations[0].context.location, 0);
        assert_eq!(
            alignment.annotations[1].context.content.as_deref(),
            Some("first\nsecond\n")
        );
    }

    #[test]
    fn test_section_assigned_from_match_start() {
        let tree = SectionTreeBuilder::from_entries(
            LocationMode::Literal,
            vec![
                TocEntry::new("Intro", 0, Some(6)),
                TocEntry::new("Body", 0, Some(12)),
            ],
        );
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &tree);

        let alignment = align(
            &index,
            vec![
                highlight("Hello", date(2020, 1, 1)),
                highlight("world foo", date(2020, 1, 1)),
                highlight("baz", date(2020, 1, 1)),
            ],
        );

        let title = |i: usize| {
            alignment.annotations[i]
                .context
                .section
                .and_then(|id| tree.get(id))
                .map(|s| s.title.clone())
        };
        assert_eq!(title(0), None);
        assert_eq!(title(1).as_deref(), Some("Intro"));
        assert_eq!(title(2).as_deref(), Some("Body"));
    }

    #[test]
    fn test_date_aggregation() {
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &SectionTree::new());

        let alignment = align(
            &index,
            vec![
                highlight("Hello", date(2020, 1, 1)),
                highlight("missing", date(2019, 6, 15)),
                highlight("baz", date(2021, 3, 1)),
            ],
        );

        let dates = alignment.dates.unwrap();
        assert_eq!(dates.created, date(2019, 6, 15));
        assert_eq!(dates.modified, date(2021, 3, 1));
        assert_eq!(alignment.matched, 2);
        assert_eq!(alignment.annotations.len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        let index = TextIndex::build(&[], &SectionTree::new());

        let alignment = align(&index, Vec::new());
        assert!(alignment.dates.is_none());
        assert!(alignment.annotations.is_empty());

        let alignment = align(&index, vec![highlight("anything", date(2020, 1, 1))]);
        assert_eq!(alignment.matched, 0);
        assert!(alignment.dates.is_some());
    }

    #[test]
    fn test_blank_annotation_not_matched() {
        let fragments = scenario();
        let index = TextIndex::build(&fragments, &SectionTree::new());
        let mut annotation = highlight("   ", date(2020, 1, 1));

        assert_eq!(Aligner::new(&index).align_one(&mut annotation), None);
    }
}
