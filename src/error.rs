//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Underlying filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot text could not be encoded or decoded
    #[error("Snapshot codec error: {0}")]
    Codec(String),

    /// Explicit load from a path that does not exist
    #[error("Cache file not found: {0}")]
    MissingFile(PathBuf),

    /// Snapshot file is not valid UTF-8
    #[error("Cache file is not valid UTF-8: {0}")]
    InvalidEncoding(PathBuf),

    /// Mutating call on a destroyed cache instance
    #[error("Cache instance has been destroyed")]
    Destroyed,
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
