use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("incorrect number of delimiters in location {0:?}: expected exactly one")]
    InvalidDelimiters(String),

    #[error("location {0:?} has an empty container name")]
    EmptyContainer(String),

    #[error("location {0:?} has an empty object name")]
    EmptyObject(String),
}
