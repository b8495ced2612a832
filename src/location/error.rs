use thiserror::Error;

/// Location parsing errors
#[derive(Debug, Error)]
pub enum LocationParseError {
    #[error("Unknown location scheme: {0}")]
    UnknownScheme(String),

    #[error("Invalid line range: {0}")]
    InvalidLineRange(String),

    #[error("Expected non-negative number, found '{0}'")]
    InvalidNumber(String),

    #[error("Invalid xpath position: {0}")]
    InvalidXPath(String),

    #[error("Empty xpath in position: {0}")]
    EmptyXPath(String),

    #[error("Invalid xpath location record: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
