//! Error types for markdown-pdf.
//!
//! Environmental failures (missing files, a missing renderer, a renderer that
//! exits non-zero) are not errors in this sense: they are reported through
//! [`RenderOutcome`](crate::RenderOutcome). [`Error`] is reserved for caller
//! contract violations and for failures inside a single component.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for markdown-pdf operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No settings were handed to the converter.
    #[error("no settings given to the converter")]
    MissingSettings,

    /// Both inline markdown text and a markdown file were set.
    #[error("markdown text and markdown file are mutually exclusive; set exactly one")]
    ConflictingInput,

    /// A theme file override (or its extracted copy) does not exist.
    #[error("theme resource '{}' not found", path.display())]
    ThemeResourceMissing { path: PathBuf },

    /// The renderer executable could not be located.
    #[error("{tool}: could not locate executable (searched: {})", searched.join(", "))]
    ToolNotFound { tool: String, searched: Vec<String> },

    /// Settings file could not be parsed.
    #[error("invalid settings file '{}': {message}", path.display())]
    InvalidSettings { path: PathBuf, message: String },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for errors caused by the caller rather than by the environment.
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Error::MissingSettings | Error::ConflictingInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_lists_searched_names() {
        let err = Error::ToolNotFound {
            tool: "wkhtmltopdf".to_string(),
            searched: vec!["wkhtmltopdf.exe".to_string(), "wkhtmltopdf".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "wkhtmltopdf: could not locate executable (searched: wkhtmltopdf.exe, wkhtmltopdf)"
        );
    }

    #[test]
    fn programmer_errors_are_classified() {
        assert!(Error::MissingSettings.is_programmer_error());
        assert!(Error::ConflictingInput.is_programmer_error());
        assert!(!Error::Io(io::Error::other("disk full")).is_programmer_error());
    }
}
