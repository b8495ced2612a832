//! Error types for marginalia

use thiserror::Error;

use crate::formats::EpubError;
use crate::location::LocationParseError;
use crate::sources::{ClippingError, LuaParseError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Location error: {0}")]
    Location(#[from] LocationParseError),

    #[error("EPUB error: {0}")]
    Epub(#[from] EpubError),

    #[error("Clipping error: {0}")]
    Clipping(#[from] ClippingError),

    #[error("Lua error: {0}")]
    Lua(#[from] LuaParseError),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
