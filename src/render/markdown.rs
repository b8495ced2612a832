//! Markdown writer
//!
//! ```text
//! ---                      front matter
//! title: "Dune"
//! ---
//! # Dune                   document title
//! ## Book One              section, `#` x (level + 1)
//! ### Chapter 1            child; missing ancestors are printed first
//! *Page 12*                when the page grows within a section
//! > highlighted text
//! **Note:** user note
//! ```

use std::collections::HashSet;
use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::DocumentWriter;
use crate::document::{Annotation, AnnotationType, Document, NO_PAGE};
use crate::error::Result;
use crate::toc::{SectionId, SectionTree};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownWriter {
    include_context: bool,
}

impl MarkdownWriter {
    pub fn new(include_context: bool) -> Self {
        Self { include_context }
    }

    fn write_front_matter(&self, document: &Document, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "---")?;
        writeln!(out, "title: {}", quoted(&document.reference.title))?;
        if !document.reference.author.is_empty() {
            writeln!(out, "author: {}", quoted(&document.reference.author))?;
        }
        if let Some(dates) = document.dates {
            writeln!(out, "created: {}", dates.created.format(DATE_FORMAT))?;
            writeln!(out, "modified: {}", dates.modified.format(DATE_FORMAT))?;
        }
        if let Some(source) = &document.source {
            writeln!(out, "source: {}", quoted(&source.to_string_lossy()))?;
        }
        writeln!(out, "---")?;
        Ok(())
    }

    fn write_annotation(&self, annotation: &Annotation, out: &mut dyn Write) -> Result<()> {
        match annotation.kind {
            AnnotationType::Highlight => {
                for line in annotation.content.trim().lines() {
                    let line = line.trim_end();
                    if line.is_empty() {
                        writeln!(out, ">")?;
                    } else {
                        writeln!(out, "> {}", line)?;
                    }
                }
            }
            AnnotationType::Note => {
                writeln!(out, "**Note:** {}", annotation.content.trim())?;
            }
        }

        if self.include_context && annotation.kind == AnnotationType::Highlight {
            if let Some(context) = annotation.context.content.as_deref().and_then(context_text) {
                writeln!(out)?;
                writeln!(out, "_Context:_ {}", context)?;
            }
        }

        writeln!(out)?;
        Ok(())
    }
}

impl DocumentWriter for MarkdownWriter {
    fn file_extension(&self) -> &'static str {
        "md"
    }

    fn write(&self, document: &Document, out: &mut dyn Write) -> Result<()> {
        self.write_front_matter(document, out)?;
        writeln!(out)?;
        writeln!(out, "# {}", document.reference.title)?;
        writeln!(out)?;

        let mut printed: HashSet<SectionId> = HashSet::new();
        for (section, annotations) in group_by_section(&document.sections, &document.annotations) {
            if let Some(section) = section {
                for id in document.sections.path(section) {
                    if !printed.insert(id) {
                        continue;
                    }
                    if let Some(heading) = document.sections.get(id) {
                        let hashes = "#".repeat(heading.level as usize + 1);
                        writeln!(out, "{} {}", hashes, heading.title.trim())?;
                        writeln!(out)?;
                    }
                }
            }

            let mut page = NO_PAGE;
            for annotation in annotations {
                if annotation.context.page_number > page {
                    page = annotation.context.page_number;
                    writeln!(out, "*Page {}*", page)?;
                    writeln!(out)?;
                }
                self.write_annotation(annotation, out)?;
            }
        }

        out.flush()?;
        Ok(())
    }
}

/// Unsectioned annotations first, then sections by location. Each group is
/// ordered by annotation location; ties keep input order.
fn group_by_section<'a>(
    sections: &SectionTree,
    annotations: &'a [Annotation],
) -> Vec<(Option<SectionId>, Vec<&'a Annotation>)> {
    let mut groups: Vec<(Option<SectionId>, Vec<&'a Annotation>)> = Vec::new();

    let mut unsectioned: Vec<&Annotation> = annotations
        .iter()
        .filter(|a| a.context.section.map_or(true, |id| sections.get(id).is_none()))
        .collect();
    if !unsectioned.is_empty() {
        unsectioned.sort_by_key(|a| a.context.location);
        groups.push((None, unsectioned));
    }

    for id in sections.sorted_by_location() {
        let mut members: Vec<&Annotation> = annotations
            .iter()
            .filter(|a| a.context.section == Some(id))
            .collect();
        if members.is_empty() {
            continue;
        }
        members.sort_by_key(|a| a.context.location);
        groups.push((Some(id), members));
    }

    groups
}

/// Plain text of the markup surrounding a highlight
fn context_text(markup: &str) -> Option<String> {
    let stripped = MARKUP_TAG.replace_all(markup, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    let text = WHITESPACE.replace_all(decoded.trim(), " ").into_owned();
    (!text.is_empty()).then_some(text)
}

/// Double-quoted YAML scalar
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('"', "'")))
}
