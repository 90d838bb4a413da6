use blob_types::ContentLocation;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(ContentLocation),

    /// The bucket does not exist or cannot be reached.
    #[error("bucket {0} not available")]
    BucketUnavailable(String),

    /// The multipart upload has already been finished or aborted.
    #[error("multipart upload for {0} already finished")]
    AlreadyFinished(ContentLocation),

    /// The multipart upload id is unknown to the store.
    #[error("no such multipart upload: {0}")]
    NoSuchUpload(String),

    /// A non-final part is below the store's minimum part size.
    #[error("part {part_number} is {size} bytes, below the minimum of {min} bytes")]
    PartTooSmall { part_number: u32, size: usize, min: usize },

    /// A download was requested with a zero chunk size.
    #[error("chunk size must be positive")]
    InvalidChunkSize,

    /// The underlying object store failed.
    #[error("object store error: {0}")]
    Backend(String),
}

/// Result alias for object store operations.
pub type StorageResult<T> = Result<T, StorageError>;
