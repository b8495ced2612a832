//! XHTML spine document to text fragments

use std::collections::HashMap;

use super::{normalize_entities, parse_markup, EpubError};
use crate::document::TextFragment;

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head"];

/// Text and anchors of one spine document
#[derive(Debug, Default)]
pub struct ContentDocument {
    pub fragments: Vec<TextFragment>,
    /// Absolute offset of every element carrying an `id`
    pub anchors: HashMap<String, usize>,
    /// Length of the normalized source, used as the next document's base
    pub len: usize,
}

/// Extract text fragments of `content`, offsetting positions by `base`
pub fn parse_content_document(content: &str, base: usize) -> Result<ContentDocument, EpubError> {
    let source = normalize_entities(content);
    let doc = parse_markup(&source).map_err(|e| EpubError::XmlError(e.to_string()))?;

    let mut parsed = ContentDocument {
        len: source.len(),
        ..Default::default()
    };

    for node in doc.descendants() {
        if node.is_element() {
            if let Some(id) = node.attribute("id") {
                parsed
                    .anchors
                    .entry(id.to_string())
                    .or_insert(base + node.range().start);
            }
            continue;
        }

        if !node.is_text() || !in_body(&node) {
            continue;
        }

        let range = node.range();
        let raw = source.get(range.clone()).or_else(|| node.text()).unwrap_or_default();
        if raw.trim().is_empty() {
            continue;
        }

        let parent_markup = node
            .parent_element()
            .map(|parent| inner_markup(&source, &parent))
            .unwrap_or_default();

        parsed
            .fragments
            .push(TextFragment::new(raw, base + range.start, parent_markup));
    }

    Ok(parsed)
}

/// Under `<body>` and outside elements whose text is never displayed
fn in_body(node: &roxmltree::Node) -> bool {
    let mut body = false;
    for ancestor in node.ancestors().filter(|n| n.is_element()) {
        let name = ancestor.tag_name().name();
        if SKIPPED_ELEMENTS.contains(&name) {
            return false;
        }
        if name == "body" {
            body = true;
        }
    }
    body
}

/// Source between the first and last child of `element`
fn inner_markup(source: &str, element: &roxmltree::Node) -> String {
    let (Some(first), Some(last)) = (element.first_child(), element.last_child()) else {
        return String::new();
    };
    source
        .get(first.range().start..last.range().end)
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Ignored title</title><style>p { margin: 0 }</style></head>
<body>
  <h1 id="ch1">Chapter&nbsp;One</h1>
  <p>It was a <em>bright</em> cold day.</p>
  <script>var x = 1;</script>
  <p id="second">Fish &amp; chips</p>
</body>
</html>"#;

    #[test]
    fn test_extract_fragments() {
        let parsed = parse_content_document(CHAPTER, 0).unwrap();
        let texts: Vec<String> = parsed
            .fragments
            .iter()
            .map(|f| html_escape::decode_html_entities(&f.text).into_owned())
            .collect();

        assert_eq!(
            texts,
            vec!["Chapter\u{a0}One", "It was a ", "bright", " cold day.", "Fish & chips"]
        );
    }

    #[test]
    fn test_parent_markup() {
        let parsed = parse_content_document(CHAPTER, 0).unwrap();

        assert_eq!(parsed.fragments[1].parent_markup, "It was a <em>bright</em> cold day.");
        assert_eq!(parsed.fragments[2].parent_markup, "bright");
    }

    #[test]
    fn test_offsets_are_absolute() {
        let local = parse_content_document(CHAPTER, 0).unwrap();
        let shifted = parse_content_document(CHAPTER, 5000).unwrap();

        for (a, b) in local.fragments.iter().zip(&shifted.fragments) {
            assert_eq!(a.offset + 5000, b.offset);
        }

        let offsets: Vec<usize> = local.fragments.iter().map(|f| f.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn test_anchor_offsets() {
        let parsed = parse_content_document(CHAPTER, 100).unwrap();

        let ch1 = parsed.anchors["ch1"];
        let second = parsed.anchors["second"];
        assert!(ch1 >= 100);
        assert!(ch1 < parsed.fragments[0].offset);
        assert!(second < parsed.fragments[4].offset);
        assert!(second > parsed.fragments[3].offset);
    }

    #[test]
    fn test_invalid_markup() {
        assert!(matches!(
            parse_content_document("<html><body><p>open", 0),
            Err(EpubError::XmlError(_))
        ));
    }
}
