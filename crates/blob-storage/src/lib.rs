//! Object store facade for the blob service.
//!
//! Blob bytes live in an external object store (S3 or compatible). This
//! crate wraps that collaborator behind the [`ObjectStorage`] trait and adds
//! the two access patterns the service needs:
//!
//! - [`MultipartUploader`]: lazily started multipart upload of ordered parts,
//!   completed by an explicit [`finish`](MultipartUploader::finish)
//! - [`ObjectChunks`]: lazy, forward-only chunked download
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStorage`]: `HashMap`-based store with call counters,
//!   for tests and local runs
//!
//! # Design Rules
//!
//! 1. Nothing reaches the store before the first part, and no object is
//!    visible until its upload is finished.
//! 2. Every part except the last may have to meet [`MIN_CHUNK_SIZE`].
//! 3. A finished uploader rejects further parts with
//!    [`StorageError::AlreadyFinished`].
//! 4. All backend errors are propagated, never silently ignored.

pub mod download;
pub mod error;
pub mod manager;
pub mod memory;
pub mod traits;
pub mod uploader;

pub use download::ObjectChunks;
pub use error::{StorageError, StorageResult};
pub use manager::StorageManager;
pub use memory::{InMemoryObjectStorage, StorageStats};
pub use traits::{CompletedPart, ObjectStorage};
pub use uploader::{MultipartUploader, MIN_CHUNK_SIZE};
