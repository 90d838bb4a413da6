use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use uuid::Uuid;

use blob_types::ContentLocation;

use crate::error::{StorageError, StorageResult};
use crate::traits::{CompletedPart, ObjectStorage};

/// Snapshot of the call counters of an [`InMemoryObjectStorage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub uploads_created: u64,
    pub parts_uploaded: u64,
    pub uploads_completed: u64,
    pub uploads_aborted: u64,
    pub ranges_read: u64,
    pub objects_deleted: u64,
}

#[derive(Default)]
struct Counters {
    uploads_created: AtomicU64,
    parts_uploaded: AtomicU64,
    uploads_completed: AtomicU64,
    uploads_aborted: AtomicU64,
    ranges_read: AtomicU64,
    objects_deleted: AtomicU64,
}

struct PendingUpload {
    location: ContentLocation,
    parts: BTreeMap<u32, Bytes>,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and local runs. Enforces a minimum size on every part
/// but the last, like S3 does, and counts every call so tests can assert on
/// how the store was used.
pub struct InMemoryObjectStorage {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<ContentLocation, Bytes>>,
    uploads: RwLock<HashMap<String, PendingUpload>>,
    min_part_size: usize,
    counters: Counters,
}

impl InMemoryObjectStorage {
    /// Create a store with the given buckets and minimum part size.
    pub fn new<I, S>(buckets: I, min_part_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buckets: RwLock::new(buckets.into_iter().map(Into::into).collect()),
            objects: RwLock::new(HashMap::new()),
            uploads: RwLock::new(HashMap::new()),
            min_part_size,
            counters: Counters::default(),
        }
    }

    /// Minimum size of every part except the last.
    pub fn min_part_size(&self) -> usize {
        self.min_part_size
    }

    /// Call counters so far.
    pub fn stats(&self) -> StorageStats {
        let c = &self.counters;
        StorageStats {
            uploads_created: c.uploads_created.load(Ordering::SeqCst),
            parts_uploaded: c.parts_uploaded.load(Ordering::SeqCst),
            uploads_completed: c.uploads_completed.load(Ordering::SeqCst),
            uploads_aborted: c.uploads_aborted.load(Ordering::SeqCst),
            ranges_read: c.ranges_read.load(Ordering::SeqCst),
            objects_deleted: c.objects_deleted.load(Ordering::SeqCst),
        }
    }

    /// Number of completed objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Number of uploads started but neither completed nor aborted.
    pub fn pending_upload_count(&self) -> usize {
        self.uploads.read().expect("lock poisoned").len()
    }

    /// Full content of a completed object.
    pub fn object(&self, location: &ContentLocation) -> Option<Bytes> {
        self.objects.read().expect("lock poisoned").get(location).cloned()
    }

    fn require_bucket(&self, location: &ContentLocation) -> StorageResult<()> {
        let buckets = self.buckets.read().expect("lock poisoned");
        if buckets.contains(location.container()) {
            Ok(())
        } else {
            Err(StorageError::BucketUnavailable(location.container().to_string()))
        }
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.buckets.read().expect("lock poisoned").contains(bucket))
    }

    async fn create_multipart_upload(&self, location: &ContentLocation) -> StorageResult<String> {
        self.require_bucket(location)?;
        let upload_id = Uuid::now_v7().to_string();
        self.uploads.write().expect("lock poisoned").insert(
            upload_id.clone(),
            PendingUpload {
                location: location.clone(),
                parts: BTreeMap::new(),
            },
        );
        self.counters.uploads_created.fetch_add(1, Ordering::SeqCst);
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        location: &ContentLocation,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<CompletedPart> {
        let mut uploads = self.uploads.write().expect("lock poisoned");
        let upload = uploads
            .get_mut(upload_id)
            .filter(|u| &u.location == location)
            .ok_or_else(|| StorageError::NoSuchUpload(upload_id.to_string()))?;
        let etag = format!("{part_number}-{}", data.len());
        upload.parts.insert(part_number, data);
        self.counters.parts_uploaded.fetch_add(1, Ordering::SeqCst);
        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_multipart_upload(
        &self,
        location: &ContentLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let mut uploads = self.uploads.write().expect("lock poisoned");
        let upload = uploads
            .get(upload_id)
            .filter(|u| &u.location == location)
            .ok_or_else(|| StorageError::NoSuchUpload(upload_id.to_string()))?;

        let mut assembled = BytesMut::new();
        for (i, part) in parts.iter().enumerate() {
            let data = upload.parts.get(&part.part_number).ok_or_else(|| {
                StorageError::Backend(format!("part {} was never uploaded", part.part_number))
            })?;
            let is_last = i + 1 == parts.len();
            if !is_last && data.len() < self.min_part_size {
                return Err(StorageError::PartTooSmall {
                    part_number: part.part_number,
                    size: data.len(),
                    min: self.min_part_size,
                });
            }
            assembled.extend_from_slice(data);
        }

        uploads.remove(upload_id);
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(location.clone(), assembled.freeze());
        self.counters.uploads_completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _location: &ContentLocation,
        upload_id: &str,
    ) -> StorageResult<()> {
        let removed = self.uploads.write().expect("lock poisoned").remove(upload_id);
        if removed.is_none() {
            return Err(StorageError::NoSuchUpload(upload_id.to_string()));
        }
        self.counters.uploads_aborted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn object_size(&self, location: &ContentLocation) -> StorageResult<Option<u64>> {
        let objects = self.objects.read().expect("lock poisoned");
        Ok(objects.get(location).map(|data| data.len() as u64))
    }

    async fn get_range(&self, location: &ContentLocation, range: Range<u64>) -> StorageResult<Bytes> {
        let objects = self.objects.read().expect("lock poisoned");
        let data = objects
            .get(location)
            .ok_or_else(|| StorageError::NotFound(location.clone()))?;
        let len = data.len() as u64;
        let start = range.start.min(len) as usize;
        let end = range.end.min(len).max(range.start.min(len)) as usize;
        self.counters.ranges_read.fetch_add(1, Ordering::SeqCst);
        Ok(data.slice(start..end))
    }

    async fn delete_object(&self, location: &ContentLocation) -> StorageResult<()> {
        self.objects.write().expect("lock poisoned").remove(location);
        self.counters.objects_deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStorage")
            .field("object_count", &self.object_count())
            .field("pending_uploads", &self.pending_upload_count())
            .field("min_part_size", &self.min_part_size)
            .finish()
    }
}
