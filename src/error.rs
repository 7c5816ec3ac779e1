//! # Error Handling Module
//!
//! This module defines the error types and result aliases used throughout
//! the Lightning Code Index library. It uses `thiserror` for library error
//! types.
//!
//! ## Error Categories
//!
//! - `InvalidConfiguration`: rejected tunables at construction time
//! - `PatternCompilation`: the host regex engine refused a pattern
//! - `SymbolEncoding`: malformed external symbol references
//!
//! Query-time failures are deliberately absent: a pattern that fails to
//! compile surfaces as the `Error` execution path with zero matches, and a
//! missing file is skipped silently.

use thiserror::Error;

/// Result type alias for Lightning Index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for the Lightning Code Index library
#[derive(Error, Debug)]
pub enum IndexError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The host regex engine refused the pattern
    #[error("Pattern compilation failed: {0}")]
    PatternCompilation(#[from] regex::Error),

    /// Malformed external symbol reference
    #[error("Symbol encoding error: {0}")]
    SymbolEncoding(String),

    /// JSON serialization errors for config and report records
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Generic(String),
}

impl IndexError {
    /// Create a new configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a new symbol encoding error with a custom message
    pub fn symbol<S: Into<String>>(message: S) -> Self {
        Self::SymbolEncoding(message.into())
    }

    /// Create a new generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::config("fuzzy threshold must lie in [0, 1]");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: fuzzy threshold must lie in [0, 1]"
        );
    }

    #[test]
    fn test_regex_error_conversion() {
        let compile_err = regex::Regex::new("[unclosed").unwrap_err();
        let err: IndexError = compile_err.into();
        assert!(matches!(err, IndexError::PatternCompilation(_)));
        assert!(err.to_string().starts_with("Pattern compilation failed"));
    }
}
