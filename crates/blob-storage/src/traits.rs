use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use blob_types::ContentLocation;

use crate::error::StorageResult;

/// A part accepted by the store, as needed to complete the upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// Store-assigned tag identifying the part's content.
    pub etag: String,
}

/// Object store collaborator.
///
/// All implementations must satisfy these invariants:
/// - Parts of a multipart upload are assembled in part-number order.
/// - An object becomes visible only once its upload is completed.
/// - Ranged reads never return bytes outside the requested range.
/// - All backend errors are propagated, never silently ignored.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Whether the bucket exists and is reachable.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Start a multipart upload and return its upload id.
    async fn create_multipart_upload(&self, location: &ContentLocation) -> StorageResult<String>;

    /// Upload one part of an open multipart upload.
    async fn upload_part(
        &self,
        location: &ContentLocation,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<CompletedPart>;

    /// Assemble the listed parts into one durable object.
    async fn complete_multipart_upload(
        &self,
        location: &ContentLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()>;

    /// Abandon an open multipart upload and discard its parts.
    async fn abort_multipart_upload(
        &self,
        location: &ContentLocation,
        upload_id: &str,
    ) -> StorageResult<()>;

    /// Size of an object in bytes, or `None` if it does not exist.
    async fn object_size(&self, location: &ContentLocation) -> StorageResult<Option<u64>>;

    /// Read a byte range of an object.
    async fn get_range(&self, location: &ContentLocation, range: Range<u64>) -> StorageResult<Bytes>;

    /// Delete an object. Deleting an absent object is not an error.
    async fn delete_object(&self, location: &ContentLocation) -> StorageResult<()>;
}
