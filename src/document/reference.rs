//! Document identity
//!
//! Annotation sources and document readers describe the same book with
//! differently formatted titles and authors. `DocumentReference` is the
//! identity key used to pair them up.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Minimum Jaccard overlap of author tokens for two references to be similar
const AUTHOR_SIMILARITY_THRESHOLD: f64 = 0.4;

/// Title and author of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    pub title: String,
    pub author: String,
}

impl DocumentReference {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }

    /// Check whether `other` likely refers to the same document.
    ///
    /// Exact equality always matches. Otherwise the shorter title must be a
    /// case-insensitive substring of the longer one and the author token sets
    /// must overlap by at least 40% (Jaccard). Two empty author sets never
    /// match on their own.
    pub fn is_similar(&self, other: &DocumentReference) -> bool {
        if self == other {
            return true;
        }

        if self.title.is_empty() || other.title.is_empty() {
            return false;
        }

        let left = self.title.to_lowercase();
        let right = other.title.to_lowercase();
        let (shorter, longer) = if left.len() <= right.len() {
            (&left, &right)
        } else {
            (&right, &left)
        };
        if !longer.contains(shorter.as_str()) {
            return false;
        }

        author_similarity(&self.author, &other.author)
            .map(|score| score >= AUTHOR_SIMILARITY_THRESHOLD)
            .unwrap_or(false)
    }

    /// Stable identifier derived from title and author.
    ///
    /// Unlike `Hash`, the value does not change between runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(self.author.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..16].to_string()
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.author.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} ({})", self.title, self.author)
        }
    }
}

fn author_tokens(author: &str) -> HashSet<String> {
    author
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '.' || c == ',').to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Jaccard similarity of author token sets, `None` when both sets are empty
fn author_similarity(left: &str, right: &str) -> Option<f64> {
    let left = author_tokens(left);
    let right = author_tokens(right);

    let union = left.union(&right).count();
    if union == 0 {
        return None;
    }

    let intersection = left.intersection(&right).count();
    Some(intersection as f64 / union as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_checks_title_and_author() {
        let left = DocumentReference::new("a", "b");
        let right = DocumentReference::new("a", "b");

        assert_eq!(left, right);
        assert_ne!(left, DocumentReference::new("a", "B"));
        assert_eq!(left.fingerprint(), right.fingerprint());
    }

    #[test]
    fn test_similar_title_substring() {
        let left = DocumentReference::new("abc", "b");

        for (title, expected) in [("ab", true), ("abcd", true), ("ABC", true), ("acd", false), ("ef", false)] {
            let right = DocumentReference::new(title, "b");
            assert_eq!(left.is_similar(&right), expected, "title {title}");
        }
    }

    #[test]
    fn test_similar_author_tokens() {
        let left = DocumentReference::new("abc", "John Doe");

        for (author, expected) in [
            ("Doe John", true),
            ("Doe, John", true),
            ("Doe, John PhD.", true),
            ("John Doe Jr.", true),
            ("Jane Doe", false),
        ] {
            let right = DocumentReference::new("abc", author);
            assert_eq!(left.is_similar(&right), expected, "author {author}");
        }
    }

    #[test]
    fn test_similarity_is_reflexive_and_symmetric() {
        let refs = [
            DocumentReference::new("The Rust Book", "Steve Klabnik, Carol Nichols"),
            DocumentReference::new("Rust Book", "Klabnik Steve"),
            DocumentReference::new("Rust", ""),
            DocumentReference::new("Something Else", "Steve Klabnik"),
        ];

        for a in &refs {
            assert!(a.is_similar(a));
            for b in &refs {
                assert_eq!(a.is_similar(b), b.is_similar(a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_empty_authors_need_exact_title() {
        let left = DocumentReference::new("Dune", "");
        assert!(left.is_similar(&DocumentReference::new("Dune", "")));
        assert!(!left.is_similar(&DocumentReference::new("Dune Messiah", "")));
    }

    #[test]
    fn test_empty_title_only_matches_itself() {
        let left = DocumentReference::new("", "Frank Herbert");
        assert!(!left.is_similar(&DocumentReference::new("Dune", "Frank Herbert")));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let reference = DocumentReference::new("Dune", "Frank Herbert");
        assert_eq!(reference.fingerprint().len(), 16);
        assert_ne!(
            reference.fingerprint(),
            DocumentReference::new("Dune", "Frank Herbert Jr").fingerprint()
        );
    }
}
