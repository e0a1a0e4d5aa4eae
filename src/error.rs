// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pattern store could not be read or written
    #[error("Storage error for {key}: {message}")]
    Storage { key: String, message: String },

    /// Page context could not be created
    #[error("Page error: {0}")]
    Page(#[from] PageError),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error with the key that failed.
    pub fn storage(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Failures raised by a live page context.
///
/// A missing element is not an error; `find_nth` reports it as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Navigation failed or the page context is gone
    #[error("page unreachable: {0}")]
    Unreachable(String),

    /// Selector could not be parsed by the page backend
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    /// In-page script failed or returned an unexpected value
    #[error("script error: {0}")]
    Script(String),
}

impl PageError {
    pub fn unreachable(message: impl fmt::Display) -> Self {
        Self::Unreachable(message.to_string())
    }

    pub fn script(message: impl fmt::Display) -> Self {
        Self::Script(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = AppError::storage("patterns/example.org.json", "disk full");
        assert_eq!(
            err.to_string(),
            "Storage error for patterns/example.org.json: disk full"
        );
    }

    #[test]
    fn test_page_error_converts() {
        let err: AppError = PageError::unreachable("connection reset").into();
        assert!(matches!(err, AppError::Page(PageError::Unreachable(_))));
    }
}
