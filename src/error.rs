//! Error types for placedex.
//!
//! Every fallible operation returns [`Result`], whose error side is the
//! [`PlacedexError`] enum. The variants follow the ingestion/query policy of the
//! engine: some errors are record-level and contained by the writer, others are
//! fatal and surface immediately.
//!
//! # Examples
//!
//! ```
//! use placedex::error::{PlacedexError, Result};
//!
//! fn check(value: &str) -> Result<f64> {
//!     value
//!         .parse::<f64>()
//!         .map_err(|_| PlacedexError::validation("stars", format!("'{value}' is not a number")))
//! }
//!
//! let err = check("many").unwrap_err();
//! assert!(err.is_record_level());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for placedex operations.
#[derive(Error, Debug)]
pub enum PlacedexError {
    /// I/O errors from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or duplicate schema definition, or a schema mismatch on open.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A single record failed type coercion, a required field, or uniqueness.
    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    /// A timestamp field did not match the fixed format.
    #[error("Parse error on field '{field}': invalid timestamp '{value}'")]
    Parse { field: String, value: String },

    /// Flushing staged documents failed; nothing from this commit is visible.
    #[error("Commit error: {0}")]
    Commit(String),

    /// Malformed query string.
    #[error("Query syntax error at {position}: {message}")]
    QuerySyntax { message: String, position: usize },

    /// Invalid argument passed by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or corrupt persisted data.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation on a closed index.
    #[error("Index is closed")]
    Closed,

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with PlacedexError.
pub type Result<T> = std::result::Result<T, PlacedexError>;

impl PlacedexError {
    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        PlacedexError::Schema(msg.into())
    }

    /// Create a new validation error for `field`.
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, msg: S) -> Self {
        PlacedexError::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a new timestamp parse error carrying the offending value.
    pub fn parse<F: Into<String>, S: Into<String>>(field: F, value: S) -> Self {
        PlacedexError::Parse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a new commit error.
    pub fn commit<S: Into<String>>(msg: S) -> Self {
        PlacedexError::Commit(msg.into())
    }

    /// Create a new query syntax error at byte `position` of the query string.
    pub fn query_syntax<S: Into<String>>(msg: S, position: usize) -> Self {
        PlacedexError::QuerySyntax {
            message: msg.into(),
            position,
        }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PlacedexError::InvalidArgument(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PlacedexError::Storage(msg.into())
    }

    /// True when the error concerns one record only and the batch can continue.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            PlacedexError::Validation { .. } | PlacedexError::Parse { .. }
        )
    }

    /// True when retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlacedexError::Commit(_))
    }
}

impl From<bincode::Error> for PlacedexError {
    fn from(err: bincode::Error) -> Self {
        PlacedexError::Storage(format!("Stored field encoding failed: {err}"))
    }
}
