//! Serialized locations
//!
//! Annotation sources record where a highlight sits using their own
//! location scheme. Each scheme parses into a totally ordered value so that
//! annotations can be processed in document order.
//!
//! # Schemes
//!
//! ```text
//! line://120-124
//!        │   └── end line
//!        └────── start line (Kindle "Location")
//!
//! /body/DocFragment[9]/body/article/p[3]/text().42
//!                  │  └────────┬───────────────┘ └── character offset
//!                  │           └─────────────────── xpath inside the fragment
//!                  └─────────────────────────────── spine document (1-based)
//! ```
//!
//! EPUB xpath ranges are stored as a JSON record holding the start and end
//! points plus the page and sequence number reported by the reader.
//!
//! # Usage
//!
//! ```ignore
//! use marginalia::location::Location;
//!
//! let a: Location = "line://10-12".parse()?;
//! let b: Location = "line://10-14".parse()?;
//! assert!(a < b);
//! assert_eq!(a.to_string(), "line://10-12");
//! ```

mod error;
mod line;
mod xpath;

use std::fmt;
use std::str::FromStr;

pub use error::LocationParseError;
pub use line::{LineLocation, LINE_SCHEME};
pub use xpath::{EpubPoint, EpubXPathLocation};

/// A parsed location in any supported scheme
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Location {
    Line(LineLocation),
    EpubXPath(EpubXPathLocation),
}

/// Location scheme. Positions are only comparable within one scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationScheme {
    Line,
    EpubXPath,
}

impl Location {
    pub fn scheme(&self) -> LocationScheme {
        match self {
            Location::Line(_) => LocationScheme::Line,
            Location::EpubXPath(_) => LocationScheme::EpubXPath,
        }
    }
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start();
        if trimmed.starts_with(LINE_SCHEME) {
            trimmed.parse().map(Location::Line)
        } else if trimmed.starts_with('{') {
            trimmed.parse().map(Location::EpubXPath)
        } else {
            Err(LocationParseError::UnknownScheme(s.to_string()))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(line) => line.fmt(f),
            Location::EpubXPath(xpath) => xpath.fmt(f),
        }
    }
}

impl From<LineLocation> for Location {
    fn from(value: LineLocation) -> Self {
        Location::Line(value)
    }
}

impl From<EpubXPathLocation> for Location {
    fn from(value: EpubXPathLocation) -> Self {
        Location::EpubXPath(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_line_scheme() {
        let location: Location = "line://5-9".parse().unwrap();
        assert_eq!(location, Location::Line(LineLocation::new(5, 9)));
        assert_eq!(location.scheme(), LocationScheme::Line);
    }

    #[test]
    fn test_dispatch_xpath_scheme() {
        let xpath = EpubXPathLocation::from_positions(
            "/body/DocFragment[3]/body/p[1]/text().0",
            "/body/DocFragment[3]/body/p[1]/text().8",
            4,
            1,
        )
        .unwrap();
        let serialized = xpath.to_string();

        let location: Location = serialized.parse().unwrap();
        assert_eq!(location.scheme(), LocationScheme::EpubXPath);
        assert!(matches!(&location, Location::EpubXPath(x) if x.start.document_fragment_id == 3));
        assert_eq!(location.to_string(), serialized);
    }

    #[test]
    fn test_unknown_scheme() {
        assert!(matches!(
            "kindle:120".parse::<Location>(),
            Err(LocationParseError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_sort_mixed_line_locations() {
        let mut locations: Vec<Location> = ["line://40-41", "line://3-9", "line://3-4"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        locations.sort();

        let sorted: Vec<String> = locations.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, vec!["line://3-4", "line://3-9", "line://40-41"]);
    }
}
