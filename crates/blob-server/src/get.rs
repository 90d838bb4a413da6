use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use blob_types::ContentLocation;

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};

/// Destination for the chunks of a get call.
#[async_trait]
pub trait ChunkSink: Send {
    /// Deliver one chunk. An error stops the call; nothing is retried.
    async fn send_chunk(&mut self, chunk: Bytes) -> ServiceResult<()>;
}

/// Get call: resolve a reverse index to its stored object and stream it out.
#[derive(Clone, Debug)]
pub struct GetPipeline {
    ctx: ServiceContext,
}

impl GetPipeline {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Follow reverse index -> content hash -> blob item -> location.
    ///
    /// Touches only the metadata store.
    pub async fn resolve(&self, reverse_index: &str) -> ServiceResult<ContentLocation> {
        let database = self.ctx.database();
        let index_item = database
            .find_reverse_index_item(reverse_index)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no reverse index item found for [{reverse_index}]"))
            })?;
        let blob_item = database
            .find_blob_item(index_item.content_hash())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no blob item found for content hash [{}]",
                    index_item.content_hash()
                ))
            })?;
        Ok(blob_item.location().clone())
    }

    /// Stream the blob bound to `reverse_index` into `sink`, in order.
    /// Returns the number of bytes delivered.
    pub async fn run<S>(&self, reverse_index: &str, sink: &mut S) -> ServiceResult<u64>
    where
        S: ChunkSink + ?Sized,
    {
        let location = self.resolve(reverse_index).await?;
        let chunk_size = self.ctx.config().get_chunk_size();
        let mut chunks = self.ctx.storage().object_stream(&location, chunk_size).await?;
        debug!(reverse_index, %location, size = chunks.size(), chunk_size, "streaming blob");

        let mut sent = 0u64;
        while let Some(chunk) = chunks.next_chunk().await? {
            let len = chunk.len() as u64;
            sink.send_chunk(chunk).await?;
            sent += len;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::context::InMemoryBackends;
    use crate::error::ErrorKind;
    use blob_database::{BlobItem, ReverseIndexItem};

    #[derive(Default)]
    struct Collect(Vec<Bytes>);

    #[async_trait]
    impl ChunkSink for Collect {
        async fn send_chunk(&mut self, chunk: Bytes) -> ServiceResult<()> {
            self.0.push(chunk);
            Ok(())
        }
    }

    fn setup() -> (InMemoryBackends, GetPipeline) {
        let config = ServerConfig {
            max_message_size: 8,
            min_chunk_size: 1,
            ..ServerConfig::default()
        };
        let backends = InMemoryBackends::new(&config);
        let get = GetPipeline::new(backends.context(config));
        (backends, get)
    }

    #[tokio::test]
    async fn dangling_reverse_index_is_not_found() {
        let (backends, get) = setup();
        get.ctx
            .database()
            .put_reverse_index(&ReverseIndexItem::new("r", "missing-hash").unwrap())
            .await
            .unwrap();
        let err = get.run("r", &mut Collect::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("missing-hash"));
        assert_eq!(backends.storage.stats().ranges_read, 0);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let (_, get) = setup();
        let location = ContentLocation::new("commapp-blob", "h").unwrap();
        let database = get.ctx.database();
        database
            .create_blob_item(&BlobItem::new("h", location, 1).unwrap())
            .await
            .unwrap();
        database
            .put_reverse_index(&ReverseIndexItem::new("r", "h").unwrap())
            .await
            .unwrap();
        let err = get.run("r", &mut Collect::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn chunks_respect_message_budget() {
        let (_, get) = setup();
        let location = ContentLocation::new("commapp-blob", "h").unwrap();
        let mut uploader = get.ctx.storage().begin_multipart_upload(location.clone());
        uploader.add_part(Bytes::from_static(b"0123456789")).await.unwrap();
        uploader.finish().await.unwrap();
        let database = get.ctx.database();
        database
            .create_blob_item(&BlobItem::new("h", location, 1).unwrap())
            .await
            .unwrap();
        database
            .put_reverse_index(&ReverseIndexItem::new("r", "h").unwrap())
            .await
            .unwrap();

        let mut sink = Collect::default();
        let sent = get.run("r", &mut sink).await.unwrap();
        assert_eq!(sent, 10);
        let sizes: Vec<usize> = sink.0.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }
}
