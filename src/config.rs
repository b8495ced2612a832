//! Configuration management for marginalia

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Extraction settings. Environment values are defaults that command line
/// arguments override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Document file or library directory; annotation exports are looked up
    /// in the same place
    pub source: PathBuf,
    /// Output directory, or a file when `source` is a single document
    pub output: PathBuf,
    /// Append the surrounding paragraph to each highlight
    pub include_context: bool,
    /// Resolve and print table of contents sections
    pub extract_sections: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: PathBuf::from("."),
            output: PathBuf::from("."),
            include_context: false,
            extract_sections: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            source: env::var("MARGINALIA_SOURCE").map(PathBuf::from).unwrap_or(defaults.source),
            output: env::var("MARGINALIA_OUTPUT").map(PathBuf::from).unwrap_or(defaults.output),
            include_context: env_flag("MARGINALIA_CONTEXT").unwrap_or(defaults.include_context),
            extract_sections: env_flag("MARGINALIA_SECTIONS").unwrap_or(defaults.extract_sections),
        }
    }
}

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "marginalia=info";

/// Load a `.env` file (the one found from the working directory when `path`
/// is `None`) and return the log filter directives. Call before installing
/// the subscriber so a `RUST_LOG` from the file takes effect.
pub fn load_environment(path: Option<&Path>) -> String {
    match path {
        Some(path) => dotenvy::from_path(path).ok(),
        None => dotenvy::dotenv().ok().map(|_| ()),
    };
    env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string())
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
