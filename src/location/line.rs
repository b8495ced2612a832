//! Line range locations (Kindle)

use std::fmt;
use std::str::FromStr;

use super::LocationParseError;

/// Scheme prefix of serialized line locations
pub const LINE_SCHEME: &str = "line://";

/// A range of lines, ordered by start then end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineLocation {
    pub start: u32,
    pub end: u32,
}

impl LineLocation {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A single line location
    pub fn point(line: u32) -> Self {
        Self::new(line, line)
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}", LINE_SCHEME, self.start, self.end)
    }
}

impl FromStr for LineLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let range = s
            .trim()
            .strip_prefix(LINE_SCHEME)
            .ok_or_else(|| LocationParseError::UnknownScheme(s.to_string()))?;

        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| LocationParseError::InvalidLineRange(s.to_string()))?;

        Ok(Self {
            start: parse_number(start)?,
            end: parse_number(end)?,
        })
    }
}

fn parse_number(s: &str) -> Result<u32, LocationParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LocationParseError::InvalidNumber(s.to_string()));
    }
    s.parse()
        .map_err(|_| LocationParseError::InvalidNumber(s.to_string()))
}
