use thiserror::Error;

use blob_crypto::HasherError;
use blob_database::DatabaseError;
use blob_protocol::{status, BlobMessage, ProtocolError};
use blob_storage::StorageError;
use blob_types::TypeError;

/// Category of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: empty fields, missing fields, bad locations.
    Validation,
    /// Frames arrived in an order the call does not allow.
    Protocol,
    /// A reverse index or blob could not be resolved.
    NotFound,
    /// A reverse index is already bound.
    Conflict,
    /// Content did not match its hash, or a stored record is malformed.
    Integrity,
    /// A backing store failed.
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Protocol => "protocol",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Integrity => "integrity",
            Self::Upstream => "upstream",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single put or get call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// Wire status code. Every kind collapses to `INTERNAL`.
    pub fn status_code(&self) -> u32 {
        status::INTERNAL
    }

    /// The `Error` frame reported to the client.
    pub fn to_message(&self) -> BlobMessage {
        BlobMessage::Error {
            code: self.status_code(),
            message: self.to_string(),
        }
    }
}

impl From<TypeError> for ServiceError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Invalid { .. } => Self::Validation(e.to_string()),
            DatabaseError::Corrupt { .. } => Self::Integrity(e.to_string()),
            DatabaseError::AlreadyExists { .. } => Self::Conflict(e.to_string()),
            DatabaseError::Backend(_) => Self::Upstream(e.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => Self::NotFound(e.to_string()),
            _ => Self::Upstream(e.to_string()),
        }
    }
}

impl From<HasherError> for ServiceError {
    fn from(e: HasherError) -> Self {
        Self::Integrity(e.to_string())
    }
}

impl From<ProtocolError> for ServiceError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(_) | ProtocolError::ConnectionClosed => Self::Upstream(e.to_string()),
            _ => Self::Protocol(e.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of the server itself: startup, configuration, or a connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
