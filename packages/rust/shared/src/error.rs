//! Error types for IntakeForge.
//!
//! Library crates use [`IntakeForgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only fatal conditions live here. Classification and mapping gaps are
//! recorded as plain data by the stages that produce them and never
//! interrupt the pipeline.

use std::path::PathBuf;

/// Human-readable description of the two intake layouts we accept.
pub const ACCEPTED_LAYOUTS: &str = "expected either a key-value sheet (row 1 = \"Field\", \"Value\"; \
one attribute per row) or a wide sheet (one attribute label per row in column A, \
one party per column, with an optional header row whose first cell is blank)";

/// Top-level error type for all IntakeForge operations.
#[derive(Debug, thiserror::Error)]
pub enum IntakeForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The intake table matches neither supported layout or carries no data.
    #[error("format error: {message}; {ACCEPTED_LAYOUTS}")]
    Format { message: String },

    /// A workbook or CSV file could not be read into a table.
    #[error("read error: {0}")]
    Read(String),

    /// A template exists but could not be parsed, or output could not be serialized.
    #[error("render error for {document}: {message}")]
    Render { document: String, message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown document key, empty household, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IntakeForgeError>;

impl IntakeForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a format error from any displayable message.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
        }
    }

    /// Create a render error for one document.
    pub fn render(document: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Render {
            document: document.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a structural problem with the intake itself.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = IntakeForgeError::config("missing forms directory");
        assert_eq!(err.to_string(), "config error: missing forms directory");

        let err = IntakeForgeError::render("personal_app", "xref table is broken");
        assert_eq!(
            err.to_string(),
            "render error for personal_app: xref table is broken"
        );
    }

    #[test]
    fn format_error_describes_both_layouts() {
        let err = IntakeForgeError::format("no data rows after header");
        let text = err.to_string();
        assert!(err.is_format());
        assert!(text.contains("no data rows after header"));
        assert!(text.contains("key-value"));
        assert!(text.contains("wide"));
    }
}
