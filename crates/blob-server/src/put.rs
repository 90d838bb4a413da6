//! Put call: turn a stream of [`PutRequest`] frames into a stored,
//! deduplicated blob bound to a reverse index.
//!
//! The caller feeds frames to [`PutPipeline::handle`] in arrival order and
//! then calls [`PutPipeline::finish`] once the stream ends cleanly, or
//! [`PutPipeline::abandon`] if it was cut short.

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use blob_crypto::ContentHasher;
use blob_database::{BlobItem, ReverseIndexItem};
use blob_protocol::PutRequest;
use blob_storage::MultipartUploader;
use blob_types::ContentLocation;

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};
use crate::locks::KeyGuard;

/// What a successful put did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// New content was uploaded and recorded.
    Created { location: ContentLocation, bytes: u64 },
    /// Content with this hash already existed; only the reverse index was
    /// recorded.
    Deduplicated { location: ContentLocation },
}

impl PutOutcome {
    pub fn location(&self) -> &ContentLocation {
        match self {
            Self::Created { location, .. } | Self::Deduplicated { location } => location,
        }
    }
}

enum BlobState {
    /// Reverse index or content hash still missing.
    Unresolved,
    /// The hash is already stored; data is hashed but not uploaded and
    /// field frames are discarded.
    Existing { location: ContentLocation },
    /// First writer for this hash. Holds the hash lock until the blob item
    /// is committed.
    New {
        uploader: MultipartUploader,
        guard: KeyGuard,
    },
}

/// State of one put call.
pub struct PutPipeline {
    ctx: ServiceContext,
    reverse_index: Option<String>,
    content_hash: Option<String>,
    state: BlobState,
    buffer: Vec<u8>,
    hasher: ContentHasher,
    discarded: u64,
}

impl PutPipeline {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            reverse_index: None,
            content_hash: None,
            state: BlobState::Unresolved,
            buffer: Vec::new(),
            hasher: ContentHasher::new(),
            discarded: 0,
        }
    }

    /// Apply one frame.
    pub async fn handle(&mut self, frame: PutRequest) -> ServiceResult<()> {
        if matches!(self.state, BlobState::Existing { .. }) {
            self.discard(&frame);
            return Ok(());
        }

        match frame {
            PutRequest::ReverseIndex(value) => {
                debug!(reverse_index = %value, "reading reverse index");
                assign("reverse index", &mut self.reverse_index, value)?;
            }
            PutRequest::ContentHash(value) => {
                debug!(content_hash = %value, "reading content hash");
                assign("content hash", &mut self.content_hash, value.to_ascii_lowercase())?;
            }
            PutRequest::DataChunk(chunk) => self.accept_chunk(chunk).await?,
        }

        if matches!(self.state, BlobState::Unresolved) && self.reverse_index.is_some() {
            if let Some(hash) = self.content_hash.clone() {
                self.resolve(hash).await?;
            }
        }
        Ok(())
    }

    async fn accept_chunk(&mut self, chunk: Vec<u8>) -> ServiceResult<()> {
        let min_chunk_size = self.ctx.config().min_chunk_size;
        match &mut self.state {
            BlobState::Unresolved => Err(ServiceError::Protocol(
                "data chunks pushed before the storage path was established".into(),
            )),
            BlobState::Existing { .. } => {
                self.hasher.update(&chunk);
                Ok(())
            }
            BlobState::New { uploader, .. } => {
                trace!(size = chunk.len(), "reading data chunk");
                self.hasher.update(&chunk);
                self.buffer.extend_from_slice(&chunk);
                if self.buffer.len() > min_chunk_size {
                    let part = Bytes::from(std::mem::take(&mut self.buffer));
                    uploader.add_part(part).await?;
                }
                Ok(())
            }
        }
    }

    async fn resolve(&mut self, content_hash: String) -> ServiceResult<()> {
        let guard = self.ctx.locks().lock(&content_hash).await;
        match self.ctx.database().find_blob_item(&content_hash).await? {
            Some(item) => {
                drop(guard);
                info!(
                    content_hash = %content_hash,
                    location = %item.location(),
                    "content already stored, deduplicating"
                );
                self.state = BlobState::Existing {
                    location: item.location().clone(),
                };
            }
            None => {
                let location = ContentLocation::new(self.ctx.config().bucket.as_str(), content_hash)?;
                debug!(%location, "storing new content");
                let uploader = self.ctx.storage().begin_multipart_upload(location);
                self.state = BlobState::New { uploader, guard };
            }
        }
        Ok(())
    }

    fn discard(&mut self, frame: &PutRequest) {
        if let PutRequest::DataChunk(chunk) = frame {
            self.hasher.update(chunk);
            self.discarded += chunk.len() as u64;
        }
        trace!(field = frame.field_name(), "discarding frame of deduplicated put");
    }

    /// Complete the call after the stream ended cleanly.
    pub async fn finish(mut self) -> ServiceResult<PutOutcome> {
        let (reverse_index, content_hash) = match (self.reverse_index.take(), self.content_hash.take()) {
            (Some(r), Some(h)) => (r, h),
            (None, _) => return Err(ServiceError::Validation("reverse index has not been provided".into())),
            (_, None) => return Err(ServiceError::Validation("content hash has not been provided".into())),
        };

        let outcome = match std::mem::replace(&mut self.state, BlobState::Unresolved) {
            BlobState::Unresolved => {
                return Err(ServiceError::Protocol(
                    "stream ended before the storage path was established".into(),
                ))
            }
            BlobState::Existing { location } => {
                debug!(discarded = self.discarded, "deduplicated put drained");
                if let Err(e) = self.hasher.verify(&content_hash) {
                    warn!(%location, error = %e, "content hash mismatch on deduplicated put");
                    return Err(e.into());
                }
                PutOutcome::Deduplicated { location }
            }
            BlobState::New { uploader, guard } => {
                let outcome = self.commit_new_blob(uploader, &content_hash).await;
                drop(guard);
                outcome?
            }
        };

        let item = ReverseIndexItem::new(reverse_index.as_str(), content_hash.as_str())?;
        self.ctx.database().put_reverse_index(&item).await?;
        info!(
            reverse_index = %reverse_index,
            content_hash = %content_hash,
            location = %outcome.location(),
            "put complete"
        );
        Ok(outcome)
    }

    async fn commit_new_blob(
        &mut self,
        mut uploader: MultipartUploader,
        content_hash: &str,
    ) -> ServiceResult<PutOutcome> {
        if let Err(e) = self.complete_upload(&mut uploader).await {
            abort_quietly(&mut uploader).await;
            return Err(e);
        }
        let location = uploader.location().clone();

        if let Err(e) = self.hasher.verify(content_hash) {
            warn!(%location, error = %e, "content hash mismatch, removing object");
            if let Err(remove_err) = self.ctx.storage().remove_object(&location).await {
                warn!(%location, error = %remove_err, "failed to remove mismatched object");
            }
            return Err(e.into());
        }

        let item = BlobItem::new(content_hash, location.clone(), self.ctx.clock().now_millis())?;
        if !self.ctx.database().create_blob_item(&item).await? {
            warn!(content_hash, "blob item already recorded by another writer");
        }
        Ok(PutOutcome::Created {
            location,
            bytes: self.hasher.bytes_hashed(),
        })
    }

    async fn complete_upload(&mut self, uploader: &mut MultipartUploader) -> ServiceResult<()> {
        if !self.buffer.is_empty() {
            let part = Bytes::from(std::mem::take(&mut self.buffer));
            uploader.add_part(part).await?;
        }
        uploader.finish().await?;
        Ok(())
    }

    /// Drop all call state after the stream was cut short, aborting any
    /// multipart upload in progress. Failures are logged, not returned.
    pub async fn abandon(&mut self) {
        if let BlobState::New { mut uploader, guard } =
            std::mem::replace(&mut self.state, BlobState::Unresolved)
        {
            abort_quietly(&mut uploader).await;
            drop(guard);
        }
        self.buffer = Vec::new();
        self.reverse_index = None;
        self.content_hash = None;
        debug!("put abandoned");
    }
}

impl std::fmt::Debug for PutPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            BlobState::Unresolved => "unresolved",
            BlobState::Existing { .. } => "existing",
            BlobState::New { .. } => "new",
        };
        f.debug_struct("PutPipeline")
            .field("reverse_index", &self.reverse_index)
            .field("content_hash", &self.content_hash)
            .field("state", &state)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

fn assign(label: &str, slot: &mut Option<String>, value: String) -> ServiceResult<()> {
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{label} must not be empty")));
    }
    if slot.is_some() {
        return Err(ServiceError::Protocol(format!(
            "multiple assignment for {label} is not allowed"
        )));
    }
    *slot = Some(value);
    Ok(())
}

async fn abort_quietly(uploader: &mut MultipartUploader) {
    if uploader.is_finished() {
        return;
    }
    if let Err(e) = uploader.abort().await {
        warn!(location = %uploader.location(), error = %e, "failed to abort upload");
    }
}
