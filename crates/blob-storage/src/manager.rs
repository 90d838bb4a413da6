use std::sync::Arc;

use tracing::{debug, info};

use blob_types::ContentLocation;

use crate::download::ObjectChunks;
use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStorage;
use crate::uploader::MultipartUploader;

/// Facade over an [`ObjectStorage`] collaborator.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct StorageManager {
    storage: Arc<dyn ObjectStorage>,
}

impl StorageManager {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Fail unless `bucket` exists and is reachable.
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.storage.bucket_exists(bucket).await? {
            info!(bucket, "bucket available");
            Ok(())
        } else {
            Err(StorageError::BucketUnavailable(bucket.to_string()))
        }
    }

    /// Prepare a multipart upload to `location`. No call reaches the store
    /// until the first part is added.
    pub fn begin_multipart_upload(&self, location: ContentLocation) -> MultipartUploader {
        MultipartUploader::new(self.storage.clone(), location)
    }

    /// Open a chunked download of the object at `location`.
    pub async fn object_stream(
        &self,
        location: &ContentLocation,
        max_chunk_size: usize,
    ) -> StorageResult<ObjectChunks> {
        let size = self
            .storage
            .object_size(location)
            .await?
            .ok_or_else(|| StorageError::NotFound(location.clone()))?;
        debug!(%location, size, max_chunk_size, "object stream opened");
        ObjectChunks::new(self.storage.clone(), location.clone(), size, max_chunk_size)
    }

    /// Whether an object exists at `location`.
    pub async fn object_exists(&self, location: &ContentLocation) -> StorageResult<bool> {
        Ok(self.storage.object_size(location).await?.is_some())
    }

    /// Delete the object at `location`.
    pub async fn remove_object(&self, location: &ContentLocation) -> StorageResult<()> {
        debug!(%location, "removing object");
        self.storage.delete_object(location).await
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager").finish_non_exhaustive()
    }
}
