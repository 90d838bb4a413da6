use std::sync::Arc;

use bytes::Bytes;

use blob_types::ContentLocation;

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStorage;

/// Lazy, forward-only sequence of chunks of one object.
///
/// Each call to [`next_chunk`](Self::next_chunk) issues one ranged read of at
/// most `max_chunk_size` bytes. The sequence cannot be rewound; start a new
/// download to read the object again.
pub struct ObjectChunks {
    storage: Arc<dyn ObjectStorage>,
    location: ContentLocation,
    size: u64,
    offset: u64,
    max_chunk_size: usize,
}

impl ObjectChunks {
    pub(crate) fn new(
        storage: Arc<dyn ObjectStorage>,
        location: ContentLocation,
        size: u64,
        max_chunk_size: usize,
    ) -> StorageResult<Self> {
        if max_chunk_size == 0 {
            return Err(StorageError::InvalidChunkSize);
        }
        Ok(Self {
            storage,
            location,
            size,
            offset: 0,
            max_chunk_size,
        })
    }

    /// Total object size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes not yet returned.
    pub fn remaining(&self) -> u64 {
        self.size - self.offset
    }

    /// The next chunk, or `None` once the whole object has been returned.
    pub async fn next_chunk(&mut self) -> StorageResult<Option<Bytes>> {
        if self.offset >= self.size {
            return Ok(None);
        }
        let end = (self.offset + self.max_chunk_size as u64).min(self.size);
        let chunk = self
            .storage
            .get_range(&self.location, self.offset..end)
            .await?;
        if chunk.is_empty() {
            return Err(StorageError::Backend(format!(
                "object {} ended at {} bytes, expected {}",
                self.location, self.offset, self.size
            )));
        }
        self.offset += chunk.len() as u64;
        Ok(Some(chunk))
    }
}

impl std::fmt::Debug for ObjectChunks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectChunks")
            .field("location", &self.location)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .finish()
    }
}
