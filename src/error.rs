//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
///
/// None of these reach callers of `get`/`set`/`refresh`/`remove`; they are
/// written to the error log and replaced by a benign result.
#[derive(Error, Debug)]
pub enum CacheError {
    /// File system failure while touching a cache file or directory
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Entry record could not be encoded or decoded
    #[error("Malformed entry record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be mapped to a file name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Entry record exists but its payload file does not
    #[error("Payload missing for key: {0}")]
    MissingPayload(String),

    /// Configuration rejected at open
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error log could not be opened or written
    #[error("Error log unavailable: {0}")]
    ErrorLog(String),
}

impl CacheError {
    /// Wraps an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CacheError::Io {
            context: context.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
