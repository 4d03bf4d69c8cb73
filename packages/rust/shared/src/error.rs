//! Error types for footprint.
//!
//! Library crates use [`FootprintError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all footprint operations.
#[derive(Debug, thiserror::Error)]
pub enum FootprintError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during a fetch.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Oracle (LLM) request or response error.
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Headless browser launch or navigation error.
    #[error("browser error: {0}")]
    Browser(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid option, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The audit could not start because the root page was unreachable.
    #[error("root page unreachable: {url}")]
    RootUnreachable { url: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FootprintError>;

impl FootprintError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FootprintError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = FootprintError::RootUnreachable {
            url: "https://example.com".into(),
        };
        assert!(err.to_string().contains("https://example.com"));
    }
}
