//! End-to-end extraction
//!
//! ```text
//! providers ──▶ annotations grouped by DocumentReference ─┐
//!                                                          ├─ exact key, then is_similar
//! library scan ──▶ (path, DocumentReference) ─────────────┘
//!                          │
//!                          ▼  one blocking task per document
//!     split by scheme ▶ sort ▶ TextIndex ▶ align ▶ section strategies ▶ notes ▶ markdown
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::align::{align, resolve_section, AnchorStrategy, SectionStrategy, TextIndex, TitleStrategy};
use crate::config::Config;
use crate::document::{Annotation, AnnotationType, DateSpan, Document, DocumentReference, ParsedDocument};
use crate::error::{AppError, Result};
use crate::formats::{readers, supported_extensions, DocumentReader};
use crate::location::{Location, LocationScheme};
use crate::render::{DocumentWriter, MarkdownWriter};
use crate::sources::{providers, AnnotationProvider};
use crate::toc::{SectionId, SectionTree};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    /// Documents written
    pub documents: usize,
    /// Annotations matched to a written document
    pub annotations: usize,
    /// Annotations found in their document's text
    pub aligned: usize,
}

/// A document found in the library
#[derive(Debug, Clone)]
pub struct LibraryDocument {
    pub path: PathBuf,
    pub reference: DocumentReference,
    reader: usize,
}

struct DocumentJob {
    document: LibraryDocument,
    annotations: Vec<Annotation>,
    output: PathBuf,
}

/// Section lookups tried for annotations the text search left unplaced
pub fn default_strategies() -> Vec<Box<dyn SectionStrategy>> {
    vec![Box::new(AnchorStrategy), Box::new(TitleStrategy)]
}

/// Order annotations by parsed location. Stable; annotations whose
/// location does not parse are kept, after every located one.
pub fn order_by_location(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let mut located: Vec<(Location, Annotation)> = Vec::with_capacity(annotations.len());
    let mut unlocated = Vec::new();

    for annotation in annotations {
        match annotation.context.serialized_location.parse::<Location>() {
            Ok(location) => located.push((location, annotation)),
            Err(e) => {
                warn!(
                    document = %annotation.document,
                    "Keeping annotation unaligned, invalid location: {}", e
                );
                unlocated.push(annotation);
            }
        }
    }

    located.sort_by(|(a, _), (b, _)| a.cmp(b));
    located
        .into_iter()
        .map(|(_, annotation)| annotation)
        .chain(unlocated)
        .collect()
}

/// Split annotations by location scheme, in first-seen order. Positions of
/// different schemes cannot be compared, so each part is aligned with its
/// own cursor. Annotations whose location does not parse form the last part.
pub fn partition_by_scheme(annotations: Vec<Annotation>) -> Vec<Vec<Annotation>> {
    let mut parts: Vec<(Option<LocationScheme>, Vec<Annotation>)> = Vec::new();

    for annotation in annotations {
        let scheme = annotation
            .context
            .serialized_location
            .parse::<Location>()
            .ok()
            .map(|location| location.scheme());
        match parts.iter_mut().find(|(s, _)| *s == scheme) {
            Some((_, part)) => part.push(annotation),
            None => parts.push((scheme, vec![annotation])),
        }
    }

    parts.sort_by_key(|(scheme, _)| scheme.is_none());
    parts.into_iter().map(|(_, part)| part).collect()
}

/// Highlight a note was written on: the one with the same serialized
/// location, else for line locations one ending on the note's line, else one
/// whose range holds it. The latest wins a tie.
fn note_owner(annotations: &[Annotation], note: &Annotation) -> Option<usize> {
    let line = match note.context.serialized_location.parse::<Location>() {
        Ok(Location::Line(range)) => Some(range.start),
        _ => None,
    };
    let rank = |highlight: &Annotation| -> Option<u8> {
        if highlight.kind != AnnotationType::Highlight {
            return None;
        }
        if highlight.context.serialized_location == note.context.serialized_location {
            return Some(2);
        }
        let (Some(line), Ok(Location::Line(range))) = (line, highlight.context.serialized_location.parse::<Location>())
        else {
            return None;
        };
        if range.end == line {
            Some(1)
        } else {
            range.contains(line).then_some(0)
        }
    };

    annotations
        .iter()
        .enumerate()
        .filter_map(|(position, highlight)| rank(highlight).map(|r| (r, position)))
        .max()
        .map(|(_, position)| position)
}

/// Give every note the text search could not place the section and location
/// of its highlight, and move it right after that highlight.
pub fn attach_notes(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let owners: Vec<Option<usize>> = annotations
        .iter()
        .map(|note| {
            (note.kind == AnnotationType::Note && !note.is_aligned())
                .then(|| note_owner(&annotations, note))
                .flatten()
        })
        .collect();

    let mut notes: HashMap<usize, Vec<Annotation>> = HashMap::new();
    let mut kept = Vec::with_capacity(annotations.len());
    let placed: Vec<(i64, Option<SectionId>)> = annotations
        .iter()
        .map(|a| (a.context.location, a.context.section))
        .collect();

    for (position, mut annotation) in annotations.into_iter().enumerate() {
        match owners[position] {
            Some(owner) => {
                (annotation.context.location, annotation.context.section) = placed[owner];
                notes.entry(owner).or_default().push(annotation);
            }
            None => kept.push((position, annotation)),
        }
    }

    let mut ordered = Vec::with_capacity(kept.len() + notes.values().map(Vec::len).sum::<usize>());
    for (position, annotation) in kept {
        ordered.push(annotation);
        if let Some(attached) = notes.remove(&position) {
            ordered.extend(attached);
        }
    }
    ordered
}

/// Align annotations against a parsed document.
///
/// Returns the document ready for a writer and the number of annotations
/// found in its text.
pub fn align_document(
    parsed: ParsedDocument,
    annotations: Vec<Annotation>,
    strategies: &[Box<dyn SectionStrategy>],
    extract_sections: bool,
) -> (Document, usize) {
    let sections = if extract_sections {
        parsed.sections
    } else {
        SectionTree::new()
    };

    let index = TextIndex::build(&parsed.fragments, &sections);
    let mut aligned = Vec::with_capacity(annotations.len());
    let mut matched = 0;
    let mut dates: Option<DateSpan> = None;

    for part in partition_by_scheme(annotations) {
        let alignment = align(&index, order_by_location(part));
        matched += alignment.matched;
        dates = match (dates, alignment.dates) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        aligned.extend(alignment.annotations);
    }

    if extract_sections && !sections.is_empty() {
        for annotation in aligned.iter_mut().filter(|a| a.context.section.is_none()) {
            annotation.context.section = resolve_section(strategies, annotation, &sections);
        }
    }

    let document = Document {
        reference: parsed.reference,
        source: None,
        sections,
        annotations: attach_notes(aligned),
        dates,
    };
    (document, matched)
}

/// Runs extraction over a single document or a library directory
pub struct ExtractWorkflow {
    readers: Arc<Vec<Box<dyn DocumentReader>>>,
    providers: Arc<Vec<Box<dyn AnnotationProvider>>>,
}

impl Default for ExtractWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractWorkflow {
    pub fn new() -> Self {
        Self {
            readers: Arc::new(readers()),
            providers: Arc::new(providers()),
        }
    }

    pub async fn run(&self, config: &Config) -> Result<ExtractSummary> {
        let start = Instant::now();
        if !config.source.exists() {
            return Err(AppError::Config(format!(
                "Source does not exist: {}",
                config.source.display()
            )));
        }

        let single = config.source.is_file();
        let jobs = {
            let readers = self.readers.clone();
            let providers = self.providers.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || plan(&readers, &providers, &config)).await??
        };
        info!("Extracting annotations for {} documents", jobs.len());

        if !single && !jobs.is_empty() {
            fs::create_dir_all(&config.output)?;
        }

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let readers = self.readers.clone();
            let include_context = config.include_context;
            let extract_sections = config.extract_sections;
            let path = job.document.path.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let reader = &readers[job.document.reader];
                run_job(reader.as_ref(), job, include_context, extract_sections)
            });
            handles.push((path, handle));
        }

        let mut summary = ExtractSummary::default();
        for (path, handle) in handles {
            match handle.await? {
                Ok((annotations, aligned)) => {
                    summary.documents += 1;
                    summary.annotations += annotations;
                    summary.aligned += aligned;
                }
                Err(e) if single => return Err(e),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        info!(
            "Extracted {} annotations ({} aligned) from {} documents in {:.2}s",
            summary.annotations,
            summary.aligned,
            summary.documents,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

fn plan(
    readers: &[Box<dyn DocumentReader>],
    providers: &[Box<dyn AnnotationProvider>],
    config: &Config,
) -> Result<Vec<DocumentJob>> {
    let annotation_dir = annotation_dir(&config.source);
    let groups = gather_annotations(providers, &annotation_dir);
    if groups.is_empty() {
        info!("No annotations found in {}", annotation_dir.display());
        return Ok(Vec::new());
    }

    let library = scan_library(readers, &config.source)?;
    let assigned = match_annotations(&library, groups);

    let jobs = library
        .into_iter()
        .zip(assigned)
        .filter(|(_, annotations)| !annotations.is_empty())
        .map(|(document, annotations)| {
            let output = output_path(config, &document);
            DocumentJob {
                document,
                annotations,
                output,
            }
        })
        .collect();
    Ok(jobs)
}

fn annotation_dir(source: &Path) -> PathBuf {
    if source.is_file() {
        match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        source.to_path_buf()
    }
}

/// Annotations from every available provider, grouped by document in
/// first-seen order
fn gather_annotations(
    providers: &[Box<dyn AnnotationProvider>],
    dir: &Path,
) -> Vec<(DocumentReference, Vec<Annotation>)> {
    let mut groups: Vec<(DocumentReference, Vec<Annotation>)> = Vec::new();
    let mut positions: HashMap<DocumentReference, usize> = HashMap::new();

    for provider in providers {
        if !provider.is_available(dir) {
            debug!(provider = provider.name(), "not available");
            continue;
        }
        let annotations = match provider.annotations(dir) {
            Ok(annotations) => annotations,
            Err(e) => {
                warn!("Provider {} failed: {}", provider.name(), e);
                continue;
            }
        };

        for annotation in annotations {
            let position = *positions.entry(annotation.document.clone()).or_insert_with(|| {
                groups.push((annotation.document.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[position].1.push(annotation);
        }
    }

    groups
}

/// Supported documents at `source`: the file itself, or every matching file
/// below the directory
pub fn scan_library(readers: &[Box<dyn DocumentReader>], source: &Path) -> Result<Vec<LibraryDocument>> {
    let paths = if source.is_file() {
        if !readers.iter().any(|r| r.supports(source)) {
            return Err(AppError::UnsupportedDocument(source.display().to_string()));
        }
        vec![source.to_path_buf()]
    } else {
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let root = glob::Pattern::escape(&source.to_string_lossy());
        let mut paths = Vec::new();
        for extension in supported_extensions(readers) {
            let pattern = format!("{}/**/*.{}", root, extension);
            paths.extend(glob::glob_with(&pattern, options)?.filter_map(|p| p.ok()));
        }
        paths.sort();
        paths.dedup();
        paths
    };

    let mut library = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(reader) = readers.iter().position(|r| r.supports(&path)) else {
            continue;
        };
        let reference = fs::read(&path)
            .map_err(AppError::from)
            .and_then(|bytes| readers[reader].reference(&bytes));
        match reference {
            Ok(reference) => {
                debug!(path = %path.display(), document = %reference, "library document");
                library.push(LibraryDocument { path, reference, reader });
            }
            Err(e) => warn!("Skipping unreadable document {}: {}", path.display(), e),
        }
    }

    info!("Found {} documents in {}", library.len(), source.display());
    Ok(library)
}

/// Distribute annotation groups over library documents. An exact reference
/// match wins over a similar one; groups matching nothing are dropped.
fn match_annotations(
    library: &[LibraryDocument],
    groups: Vec<(DocumentReference, Vec<Annotation>)>,
) -> Vec<Vec<Annotation>> {
    let mut assigned: Vec<Vec<Annotation>> = vec![Vec::new(); library.len()];

    for (reference, annotations) in groups {
        let target = library
            .iter()
            .position(|doc| doc.reference == reference)
            .or_else(|| library.iter().position(|doc| doc.reference.is_similar(&reference)));

        match target {
            Some(position) => {
                debug!(
                    annotations = annotations.len(),
                    "{} matched {}", reference, library[position].path.display()
                );
                assigned[position].extend(annotations);
            }
            None => warn!(
                "No document found for {} annotations of {}",
                annotations.len(),
                reference
            ),
        }
    }

    assigned
}

fn output_path(config: &Config, document: &LibraryDocument) -> PathBuf {
    if config.source.is_file() && !config.output.is_dir() {
        return config.output.clone();
    }
    let stem = document
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.reference.fingerprint());
    config
        .output
        .join(format!("{}.{}", stem, MarkdownWriter::default().file_extension()))
}

/// Read, align and write one document. Returns the annotation and aligned
/// counts.
fn run_job(
    reader: &dyn DocumentReader,
    job: DocumentJob,
    include_context: bool,
    extract_sections: bool,
) -> Result<(usize, usize)> {
    let start = Instant::now();
    let bytes = fs::read(&job.document.path)?;
    let parsed = reader.read(&bytes)?;

    let total = job.annotations.len();
    let (mut document, aligned) = align_document(parsed, job.annotations, &default_strategies(), extract_sections);
    document.source = Some(job.document.path.clone());

    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(&job.output)?);
    MarkdownWriter::new(include_context).write(&document, &mut out)?;

    info!(
        "Wrote {} ({}/{} aligned) in {}ms",
        job.output.display(),
        aligned,
        total,
        start.elapsed().as_millis()
    );
    Ok((total, aligned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AnnotationContext, TextFragment};
    use crate::location::EpubXPathLocation;
    use crate::toc::{LocationMode, SectionTreeBuilder, TocEntry};
    use chrono::NaiveDate;

    fn annotation(content: &str, serialized: &str, reference: &DocumentReference) -> Annotation {
        Annotation::new(
            content,
            reference.clone(),
            AnnotationType::Highlight,
            AnnotationContext::new(serialized, 1),
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap().and_hms_opt(12, 0, 0).unwrap(),
        )
    }

    fn library_document(title: &str, author: &str) -> LibraryDocument {
        LibraryDocument {
            path: PathBuf::from(format!("/library/{}.epub", title)),
            reference: DocumentReference::new(title, author),
            reader: 0,
        }
    }

    #[test]
    fn test_order_by_location_keeps_invalid_last() {
        let reference = DocumentReference::new("Book", "Author");
        let ordered = order_by_location(vec![
            annotation("broken", "page 4", &reference),
            annotation("second", "line://20-22", &reference),
            annotation("first", "line://5-6", &reference),
            annotation("first again", "line://5-6", &reference),
        ]);

        let contents: Vec<&str> = ordered.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "first again", "second", "broken"]);
    }

    #[test]
    fn test_match_prefers_exact_reference() {
        let library = vec![
            library_document("Dune Messiah", "Frank Herbert"),
            library_document("Dune", "Frank Herbert"),
        ];
        let exact = DocumentReference::new("Dune", "Frank Herbert");
        let similar = DocumentReference::new("Dune: Deluxe Edition", "Herbert, Frank");
        let unknown = DocumentReference::new("Emma", "Jane Austen");

        let assigned = match_annotations(
            &library,
            vec![
                (exact.clone(), vec![annotation("a", "line://1-1", &exact)]),
                (unknown.clone(), vec![annotation("b", "line://1-1", &unknown)]),
            ],
        );
        assert!(assigned[0].is_empty());
        assert_eq!(assigned[1].len(), 1);

        // Title containment alone is not enough without overlapping authors
        let stranger = DocumentReference::new("Dune", "Someone Else");
        let assigned = match_annotations(&library, vec![(stranger.clone(), vec![annotation("c", "line://1-1", &stranger)])]);
        assert!(assigned.iter().all(Vec::is_empty));

        let assigned = match_annotations(&library, vec![(similar.clone(), vec![annotation("d", "line://1-1", &similar)])]);
        assert_eq!(assigned.iter().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_align_document_with_sections() {
        let reference = DocumentReference::new("Book", "Author");
        let fragments = vec![
            TextFragment::new("Chapter One", 0, "Chapter One"),
            TextFragment::new("It was a dark and stormy night.", 20, "It was a dark and stormy night."),
            TextFragment::new("Chapter Two", 100, "Chapter Two"),
            TextFragment::new("The morning came.", 120, "The morning came."),
        ];
        let sections = SectionTreeBuilder::from_entries(
            LocationMode::Literal,
            vec![
                TocEntry::new("Chapter One", 0, Some(0)),
                TocEntry::new("Chapter Two", 0, Some(100)),
            ],
        );
        let parsed = ParsedDocument {
            reference: reference.clone(),
            fragments,
            sections,
        };

        let mut unmatched = annotation("never printed", "line://90-91", &reference);
        unmatched.context.chapter = Some("chapter two".to_string());

        let (document, aligned) = align_document(
            parsed,
            vec![
                unmatched,
                annotation("morning came", "line://50-51", &reference),
                annotation("dark and stormy", "line://10-11", &reference),
            ],
            &default_strategies(),
            true,
        );

        assert_eq!(aligned, 2);
        assert_eq!(document.annotations[0].content, "dark and stormy");
        assert_eq!(document.annotations[0].context.section.map(|s| s.0), Some(0));
        assert_eq!(document.annotations[1].context.section.map(|s| s.0), Some(1));
        // Placed by chapter title after the text search failed
        assert!(!document.annotations[2].is_aligned());
        assert_eq!(document.annotations[2].context.section.map(|s| s.0), Some(1));
        assert!(document.dates.is_some());
    }

    fn xpath(fragment: u32, paragraph: u32) -> String {
        let path = format!("/body/DocFragment[{}]/body/p[{}]/text()", fragment, paragraph);
        EpubXPathLocation::from_positions(&format!("{}.0", path), &format!("{}.5", path), 1, 1)
            .unwrap()
            .to_string()
    }

    fn note(content: &str, serialized: &str, reference: &DocumentReference) -> Annotation {
        let mut note = annotation(content, serialized, reference);
        note.kind = AnnotationType::Note;
        note
    }

    #[test]
    fn test_partition_by_scheme() {
        let reference = DocumentReference::new("Book", "Author");
        let parts = partition_by_scheme(vec![
            annotation("a", "line://5-6", &reference),
            annotation("b", "not a location", &reference),
            annotation("c", &xpath(1, 1), &reference),
            annotation("d", "line://1-2", &reference),
        ]);

        let contents: Vec<Vec<&str>> = parts
            .iter()
            .map(|part| part.iter().map(|a| a.content.as_str()).collect())
            .collect();
        assert_eq!(contents, vec![vec!["a", "d"], vec!["c"], vec!["b"]]);
    }

    #[test]
    fn test_align_document_mixed_sources() {
        let reference = DocumentReference::new("Book", "Author");
        let parsed = ParsedDocument {
            reference: reference.clone(),
            fragments: vec![
                TextFragment::new("alpha one", 0, "alpha one"),
                TextFragment::new("omega two", 100, "omega two"),
            ],
            sections: SectionTree::new(),
        };

        // A clipping near the end must not hide a sidecar highlight near the start
        let (document, aligned) = align_document(
            parsed,
            vec![
                annotation("omega two", "line://50-51", &reference),
                annotation("alpha one", &xpath(1, 1), &reference),
            ],
            &default_strategies(),
            true,
        );

        assert_eq!(aligned, 2);
        assert!(document.annotations.iter().all(Annotation::is_aligned));
        assert!(document.dates.is_some());
    }

    #[test]
    fn test_sidecar_note_follows_its_highlight() {
        let reference = DocumentReference::new("Book", "Author");
        let parsed = ParsedDocument {
            reference: reference.clone(),
            fragments: vec![
                TextFragment::new("First line.", 0, "First line."),
                TextFragment::new("Second line.", 50, "Second line."),
            ],
            sections: SectionTreeBuilder::from_entries(LocationMode::Literal, vec![TocEntry::new("Ch", 0, Some(0))]),
        };

        let (document, aligned) = align_document(
            parsed,
            vec![
                annotation("First line.", &xpath(1, 1), &reference),
                note("my note on first", &xpath(1, 1), &reference),
                annotation("Second line.", &xpath(1, 2), &reference),
            ],
            &default_strategies(),
            true,
        );
        assert_eq!(aligned, 2);

        let attached = &document.annotations[1];
        assert_eq!(attached.kind, AnnotationType::Note);
        assert_eq!(attached.context.location, document.annotations[0].context.location);
        assert_eq!(attached.context.section, document.annotations[0].context.section);

        let markdown = MarkdownWriter::new(false).render(&document).unwrap();
        let first = markdown.find("> First line.").unwrap();
        let note = markdown.find("**Note:** my note on first").unwrap();
        let second = markdown.find("> Second line.").unwrap();
        assert!(first < note && note < second);
    }

    #[test]
    fn test_clipping_note_attaches_by_line() {
        let reference = DocumentReference::new("Book", "Author");
        let mut first = annotation("First", "line://10-11", &reference);
        first.context.location = 0;
        first.context.section = Some(SectionId(0));
        first.context.content = Some("First".to_string());
        let mut second = annotation("Second", "line://11-14", &reference);
        second.context.location = 40;
        second.context.section = Some(SectionId(1));
        second.context.content = Some("Second".to_string());

        let ordered = attach_notes(vec![
            first,
            second,
            note("on first", "line://11-11", &reference),
            note("on second", "line://13-13", &reference),
            note("orphan", "line://90-90", &reference),
        ]);

        let contents: Vec<&str> = ordered.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents, vec!["First", "on first", "Second", "on second", "orphan"]);
        assert_eq!(ordered[1].context.section, Some(SectionId(0)));
        assert_eq!(ordered[3].context.location, 40);
        assert_eq!(ordered[4].context.section, None);
    }

    #[test]
    fn test_align_document_without_sections() {
        let reference = DocumentReference::new("Book", "Author");
        let parsed = ParsedDocument {
            reference: reference.clone(),
            fragments: vec![TextFragment::new("Some text here.", 0, "Some text here.")],
            sections: SectionTreeBuilder::from_entries(LocationMode::Literal, vec![TocEntry::new("Only", 0, Some(0))]),
        };

        let (document, aligned) = align_document(
            parsed,
            vec![annotation("text here", "line://1-1", &reference)],
            &default_strategies(),
            false,
        );
        assert_eq!(aligned, 1);
        assert!(document.sections.is_empty());
        assert_eq!(document.annotations[0].context.section, None);
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dune.v2.epub");
        std::fs::write(&path, b"").unwrap();
        let book = LibraryDocument {
            path: path.clone(),
            reference: DocumentReference::new("Dune", "Frank Herbert"),
            reader: 0,
        };

        let library = Config {
            source: dir.path().to_path_buf(),
            output: dir.path().join("out"),
            ..Default::default()
        };
        assert_eq!(output_path(&library, &book), dir.path().join("out").join("Dune.v2.md"));

        let single = Config {
            source: path.clone(),
            output: dir.path().join("notes.md"),
            ..Default::default()
        };
        assert_eq!(output_path(&single, &book), dir.path().join("notes.md"));

        let into_dir = Config {
            source: path,
            output: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(output_path(&into_dir, &book), dir.path().join("Dune.v2.md"));
    }

    #[test]
    fn test_scan_rejects_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();

        let result = scan_library(&readers(), &file);
        assert!(matches!(result, Err(AppError::UnsupportedDocument(_))));
    }
}
