//! Error types for the search subsystem
//!
//! Query text never produces an error: malformed input degrades inside the
//! parser. Errors only surface at the adapter boundary, when a domain hands
//! the engine records that cannot be indexed.

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while building or maintaining an index
#[derive(Debug, Error)]
pub enum SearchError {
    /// A record has no resolvable parent id, or two records claim the same one
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// I/O error while loading a store file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (record fingerprinting, store decoding)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRecord(_) => "INVALID_RECORD",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Shorthand for rejecting a record at the adapter boundary.
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}
