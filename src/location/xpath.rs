//! EPUB xpath locations (KOReader)
//!
//! KOReader records highlight boundaries as xpointers into the rendered
//! EPUB, e.g. `/body/DocFragment[9]/body/article/p[3]/text().42`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::LocationParseError;

static XPATH_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/body/DocFragment\[(?P<fragment>\d+)\](?P<xpath>.*)\.(?P<offset>[^.]*)$").unwrap()
});

/// A single character position inside a document fragment.
///
/// Ordered by fragment, then xpath, then character offset. Xpaths are
/// compared lexically, which is only an approximation of document order
/// (`p[10]` sorts before `p[9]`); it is kept so that exports stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpubPoint {
    #[serde(rename = "DocumentFragmentId")]
    pub document_fragment_id: u32,
    #[serde(rename = "XPath")]
    pub xpath: String,
    #[serde(rename = "CharacterLocation")]
    pub character_offset: u32,
}

impl EpubPoint {
    pub fn new(document_fragment_id: u32, xpath: impl Into<String>, character_offset: u32) -> Self {
        Self {
            document_fragment_id,
            xpath: xpath.into(),
            character_offset,
        }
    }

    fn validate(&self) -> Result<(), LocationParseError> {
        if self.xpath.is_empty() {
            return Err(LocationParseError::EmptyXPath(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for EpubPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/body/DocFragment[{}]{}.{}",
            self.document_fragment_id, self.xpath, self.character_offset
        )
    }
}

impl FromStr for EpubPoint {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = XPATH_POINT
            .captures(s.trim())
            .ok_or_else(|| LocationParseError::InvalidXPath(s.to_string()))?;

        let fragment = &captures["fragment"];
        let xpath = &captures["xpath"];
        let offset = &captures["offset"];

        if xpath.is_empty() {
            return Err(LocationParseError::EmptyXPath(s.to_string()));
        }

        Ok(Self {
            document_fragment_id: fragment
                .parse()
                .map_err(|_| LocationParseError::InvalidNumber(fragment.to_string()))?,
            xpath: xpath.to_string(),
            character_offset: offset
                .parse()
                .map_err(|_| LocationParseError::InvalidNumber(offset.to_string()))?,
        })
    }
}

/// A highlighted range between two xpath points
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpubXPathLocation {
    #[serde(rename = "Start")]
    pub start: EpubPoint,
    #[serde(rename = "End")]
    pub end: EpubPoint,
    /// Page of the start point on the reading device
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
    /// Order of the highlight within its page
    #[serde(rename = "SequenceNumber")]
    pub sequence_number: u32,
}

impl EpubXPathLocation {
    pub fn new(start: EpubPoint, end: EpubPoint, page_number: u32, sequence_number: u32) -> Self {
        Self {
            start,
            end,
            page_number,
            sequence_number,
        }
    }

    /// Build a location from raw `pos0`/`pos1` xpointers
    pub fn from_positions(
        pos0: &str,
        pos1: &str,
        page_number: u32,
        sequence_number: u32,
    ) -> Result<Self, LocationParseError> {
        Ok(Self::new(pos0.parse()?, pos1.parse()?, page_number, sequence_number))
    }

    /// Packs fragment, page and sequence into a single sortable number
    pub fn ordinal(&self) -> i64 {
        (i64::from(self.start.document_fragment_id) << 16)
            | (i64::from(self.page_number) << 8)
            | i64::from(self.sequence_number)
    }
}

impl fmt::Display for EpubXPathLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for EpubXPathLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location: EpubXPathLocation = serde_json::from_str(s)?;
        location.start.validate()?;
        location.end.validate()?;
        Ok(location)
    }
}
