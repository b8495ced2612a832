//! Navigation document parsing (EPUB 3 NAV and EPUB 2 NCX)

use super::{normalize_entities, parse_markup, resolve_path};

/// A table of contents link in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub title: String,
    /// Full archive path of the target document
    pub path: String,
    /// Element id after `#`, if any
    pub fragment: Option<String>,
    /// Element ancestor count of the link in the navigation document
    pub depth: usize,
}

impl NavLink {
    fn new(title: String, href: &str, base_dir: &str, depth: usize) -> Self {
        let (file, fragment) = match href.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment.to_string()).filter(|f| !f.is_empty())),
            None => (href, None),
        };
        Self {
            title,
            path: resolve_path(base_dir, file),
            fragment,
            depth,
        }
    }
}

fn depth(node: &roxmltree::Node) -> usize {
    node.ancestors().skip(1).filter(|n| n.is_element()).count()
}

fn text_content(node: &roxmltree::Node) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Links of the `nav[epub:type~=toc]` element, or of the first nav with any
pub fn parse_nav_document(content: &str, base_dir: &str) -> Vec<NavLink> {
    let text = normalize_entities(content);
    let Ok(doc) = parse_markup(&text) else {
        return Vec::new();
    };

    let navs: Vec<roxmltree::Node> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "nav")
        .collect();

    let is_toc = |nav: &roxmltree::Node| {
        nav.attributes()
            .any(|a| a.name() == "type" && a.value().split_whitespace().any(|v| v == "toc"))
    };

    let links_of = |nav: &roxmltree::Node| -> Vec<NavLink> {
        nav.descendants()
            .filter(|n| n.tag_name().name() == "a")
            .filter_map(|a| {
                let href = a.attribute("href")?;
                let title = text_content(&a);
                if title.is_empty() {
                    return None;
                }
                Some(NavLink::new(title, href, base_dir, depth(&a)))
            })
            .collect()
    };

    if let Some(nav) = navs.iter().find(|nav| is_toc(nav)) {
        return links_of(nav);
    }

    navs.iter()
        .map(links_of)
        .find(|links| !links.is_empty())
        .unwrap_or_default()
}

/// Links of the NCX `navMap`, nested `navPoint`s included
pub fn parse_ncx_document(content: &str, base_dir: &str) -> Vec<NavLink> {
    let text = normalize_entities(content);
    let Ok(doc) = parse_markup(&text) else {
        return Vec::new();
    };

    let Some(nav_map) = doc.descendants().find(|n| n.tag_name().name() == "navMap") else {
        return Vec::new();
    };

    nav_map
        .descendants()
        .filter(|n| n.tag_name().name() == "navPoint")
        .filter_map(|point| {
            let label = point
                .children()
                .find(|c| c.tag_name().name() == "navLabel")
                .map(|l| text_content(&l))
                .unwrap_or_default();
            let src = point
                .children()
                .find(|c| c.tag_name().name() == "content")
                .and_then(|c| c.attribute("src"))?;
            if label.is_empty() {
                return None;
            }
            Some(NavLink::new(label, src, base_dir, depth(&point)))
        })
        .collect()
}
