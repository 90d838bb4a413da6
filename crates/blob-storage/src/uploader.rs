use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use blob_types::ContentLocation;

use crate::error::{StorageError, StorageResult};
use crate::traits::{CompletedPart, ObjectStorage};

/// Minimum size of every multipart part except the last (S3's 5 MiB floor).
pub const MIN_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// A lazily started multipart upload to one location.
///
/// Nothing is sent to the store until the first [`add_part`](Self::add_part).
/// Parts are committed in call order. After [`finish`](Self::finish) or
/// [`abort`](Self::abort) every further call fails with
/// [`StorageError::AlreadyFinished`].
pub struct MultipartUploader {
    storage: Arc<dyn ObjectStorage>,
    location: ContentLocation,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
    bytes_uploaded: u64,
    finished: bool,
}

impl MultipartUploader {
    pub(crate) fn new(storage: Arc<dyn ObjectStorage>, location: ContentLocation) -> Self {
        Self {
            storage,
            location,
            upload_id: None,
            parts: Vec::new(),
            bytes_uploaded: 0,
            finished: false,
        }
    }

    pub fn location(&self) -> &ContentLocation {
        &self.location
    }

    /// Whether the upload has been started in the store.
    pub fn is_started(&self) -> bool {
        self.upload_id.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Upload the next part, starting the upload if needed.
    pub async fn add_part(&mut self, data: Bytes) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::AlreadyFinished(self.location.clone()));
        }
        let upload_id = if let Some(id) = self.upload_id.clone() {
            id
        } else {
            let id = self.storage.create_multipart_upload(&self.location).await?;
            debug!(location = %self.location, upload_id = %id, "multipart upload started");
            self.upload_id = Some(id.clone());
            id
        };
        let part_number = self.parts.len() as u32 + 1;
        let size = data.len();
        let part = self
            .storage
            .upload_part(&self.location, &upload_id, part_number, data)
            .await?;
        self.parts.push(part);
        self.bytes_uploaded += size as u64;
        debug!(location = %self.location, part_number, size, "part uploaded");
        Ok(())
    }

    /// Assemble all parts into one durable object.
    ///
    /// An upload with no parts gets a single empty part first, so an empty
    /// payload still produces an object.
    pub async fn finish(&mut self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::AlreadyFinished(self.location.clone()));
        }
        if self.parts.is_empty() {
            self.add_part(Bytes::new()).await?;
        }
        let upload_id = self
            .upload_id
            .as_deref()
            .ok_or_else(|| StorageError::Backend("upload was never started".into()))?;
        self.storage
            .complete_multipart_upload(&self.location, upload_id, &self.parts)
            .await?;
        self.finished = true;
        debug!(
            location = %self.location,
            parts = self.parts.len(),
            bytes = self.bytes_uploaded,
            "multipart upload finished"
        );
        Ok(())
    }

    /// Abandon the upload, discarding any parts already sent.
    ///
    /// A never-started upload has nothing to discard.
    pub async fn abort(&mut self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::AlreadyFinished(self.location.clone()));
        }
        self.finished = true;
        if let Some(upload_id) = self.upload_id.take() {
            if let Err(e) = self
                .storage
                .abort_multipart_upload(&self.location, &upload_id)
                .await
            {
                warn!(location = %self.location, error = %e, "failed to abort multipart upload");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MultipartUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartUploader")
            .field("location", &self.location)
            .field("upload_id", &self.upload_id)
            .field("parts", &self.parts.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStorage;

    fn setup(min: usize) -> (Arc<InMemoryObjectStorage>, MultipartUploader) {
        let storage = Arc::new(InMemoryObjectStorage::new(["bucket"], min));
        let location = ContentLocation::new("bucket", "obj").unwrap();
        let uploader = MultipartUploader::new(storage.clone(), location);
        (storage, uploader)
    }

    #[tokio::test]
    async fn lazy_start() {
        let (storage, mut uploader) = setup(1);
        assert!(!uploader.is_started());
        assert_eq!(storage.stats().uploads_created, 0);
        uploader.add_part(Bytes::from_static(b"abc")).await.unwrap();
        assert!(uploader.is_started());
        assert_eq!(storage.stats().uploads_created, 1);
    }

    #[tokio::test]
    async fn finish_commits_object() {
        let (storage, mut uploader) = setup(2);
        uploader.add_part(Bytes::from_static(b"abc")).await.unwrap();
        uploader.add_part(Bytes::from_static(b"d")).await.unwrap();
        uploader.finish().await.unwrap();
        assert_eq!(uploader.part_count(), 2);
        assert_eq!(uploader.bytes_uploaded(), 4);
        let object = storage.object(uploader.location()).unwrap();
        assert_eq!(object, Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn finish_twice_fails() {
        let (_, mut uploader) = setup(1);
        uploader.add_part(Bytes::from_static(b"abc")).await.unwrap();
        uploader.finish().await.unwrap();
        assert!(matches!(
            uploader.finish().await.unwrap_err(),
            StorageError::AlreadyFinished(_)
        ));
        assert!(matches!(
            uploader.add_part(Bytes::from_static(b"x")).await.unwrap_err(),
            StorageError::AlreadyFinished(_)
        ));
    }

    #[tokio::test]
    async fn empty_upload_produces_empty_object() {
        let (storage, mut uploader) = setup(1);
        uploader.finish().await.unwrap();
        assert_eq!(storage.object(uploader.location()).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn abort_started_upload() {
        let (storage, mut uploader) = setup(1);
        uploader.add_part(Bytes::from_static(b"abc")).await.unwrap();
        uploader.abort().await.unwrap();
        assert_eq!(storage.pending_upload_count(), 0);
        assert_eq!(storage.object_count(), 0);
        assert!(uploader.finish().await.is_err());
    }

    #[tokio::test]
    async fn abort_unstarted_upload_touches_nothing() {
        let (storage, mut uploader) = setup(1);
        uploader.abort().await.unwrap();
        assert_eq!(storage.stats(), crate::memory::StorageStats::default());
    }
}
