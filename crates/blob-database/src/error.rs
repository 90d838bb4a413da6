//! Error types for metadata operations.

use thiserror::Error;

/// Errors that can occur during metadata store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An item failed validation before being written.
    #[error("invalid {item}: {reason}")]
    Invalid { item: &'static str, reason: String },

    /// A stored record is missing a required attribute or holds a malformed
    /// one.
    #[error("corrupt {item} record: {reason}")]
    Corrupt { item: &'static str, reason: String },

    /// A conditional insert found an existing row with the same key.
    #[error("an item for the given {item} [{key}] already exists")]
    AlreadyExists { item: &'static str, key: String },

    /// The underlying key-value store failed.
    #[error("key-value store error: {0}")]
    Backend(String),
}

/// Convenience type alias for metadata operations.
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;
