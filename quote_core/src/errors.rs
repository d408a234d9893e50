//! # Error Types
//!
//! Structured error types for quote_core. Every variant carries enough
//! context to report the problem to the operator without guessing.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::errors::{QuoteError, QuoteResult};
//!
//! fn require_id(id: &str) -> QuoteResult<()> {
//!     if id.trim().is_empty() {
//!         return Err(QuoteError::invalid_input("id", id, "Quote id cannot be blank"));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Position;

/// Result type alias for quote_core operations
pub type QuoteResult<T> = Result<T, QuoteError>;

/// Structured error type for quote operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum QuoteError {
    /// Persisted or imported data could not be decoded
    #[error("Parse error in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// A catalog position that does not exist
    #[error("Missing reference: section {section}, subsection {subsection}, item {item}")]
    MissingReference {
        section: usize,
        subsection: usize,
        item: usize,
    },

    /// An input value is invalid
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The structure catalog could not be loaded
    #[error("Catalog error: {reason}")]
    Catalog { reason: String },

    /// No saved quote with the given id
    #[error("Quote not found: {id}")]
    NotFound { id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// The quote store is locked by another process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Store schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl QuoteError {
    /// Create a Parse error
    pub fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        QuoteError::Parse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        QuoteError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a Catalog error
    pub fn catalog(reason: impl Into<String>) -> Self {
        QuoteError::Catalog {
            reason: reason.into(),
        }
    }

    /// Create a MissingReference error for a catalog position
    pub fn missing_reference(pos: Position) -> Self {
        QuoteError::MissingReference {
            section: pos.section,
            subsection: pos.subsection,
            item: pos.item,
        }
    }

    /// Create a NotFound error
    pub fn not_found(id: impl Into<String>) -> Self {
        QuoteError::NotFound { id: id.into() }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        QuoteError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        QuoteError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            QuoteError::Parse { .. } => "PARSE_ERROR",
            QuoteError::MissingReference { .. } => "MISSING_REFERENCE",
            QuoteError::InvalidInput { .. } => "INVALID_INPUT",
            QuoteError::Catalog { .. } => "CATALOG_ERROR",
            QuoteError::NotFound { .. } => "NOT_FOUND",
            QuoteError::FileError { .. } => "FILE_ERROR",
            QuoteError::FileLocked { .. } => "FILE_LOCKED",
            QuoteError::SerializationError { .. } => "SERIALIZATION_ERROR",
            QuoteError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = QuoteError::parse("import.json", "expected value at line 1 column 1");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"Parse\""));
        let roundtrip: QuoteError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(QuoteError::parse("x", "y").error_code(), "PARSE_ERROR");
        assert_eq!(QuoteError::not_found("Q-1").error_code(), "NOT_FOUND");
        assert_eq!(
            QuoteError::MissingReference { section: 99, subsection: 0, item: 0 }.error_code(),
            "MISSING_REFERENCE"
        );
    }

    #[test]
    fn test_display_message() {
        let error = QuoteError::missing_reference(Position::new(3, 1, 7));
        assert_eq!(
            error.to_string(),
            "Missing reference: section 3, subsection 1, item 7"
        );
    }
}
