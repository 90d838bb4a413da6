//! End-to-end behavior of the put and get pipelines over in-memory stores.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use proptest::prelude::*;

use blob_crypto::ContentHasher;
use blob_database::{AttributeValue, Attributes, BlobItem};
use blob_protocol::PutRequest;
use blob_server::{
    ChunkSink, ErrorKind, GetPipeline, InMemoryBackends, PutOutcome, PutPipeline, ServerConfig,
    ServiceContext, ServiceError, ServiceResult,
};
use blob_storage::StorageStats;
use blob_types::{ContentLocation, FixedClock};

const NOW: i64 = 1_700_000_000_000;

struct Harness {
    backends: InMemoryBackends,
    ctx: ServiceContext,
}

impl Harness {
    fn new() -> Self {
        let config = ServerConfig {
            min_chunk_size: 8,
            max_message_size: 16,
            ..ServerConfig::default()
        };
        let backends = InMemoryBackends::new(&config);
        let ctx = backends.context_with_clock(config, Arc::new(FixedClock::new(NOW)));
        Self { backends, ctx }
    }

    async fn put_frames(&self, frames: Vec<PutRequest>) -> ServiceResult<PutOutcome> {
        let mut put = PutPipeline::new(self.ctx.clone());
        for frame in frames {
            if let Err(e) = put.handle(frame).await {
                put.abandon().await;
                return Err(e);
            }
        }
        put.finish().await
    }

    async fn put(&self, reverse_index: &str, data: &[u8], chunk: usize) -> ServiceResult<PutOutcome> {
        self.put_frames(frames(reverse_index, &ContentHasher::hash_hex(data), data, chunk))
            .await
    }

    async fn get(&self, reverse_index: &str) -> ServiceResult<Vec<u8>> {
        let mut sink = Collect::default();
        GetPipeline::new(self.ctx.clone()).run(reverse_index, &mut sink).await?;
        Ok(sink.0.concat())
    }

    fn stats(&self) -> StorageStats {
        self.backends.storage.stats()
    }
}

fn frames(reverse_index: &str, hash: &str, data: &[u8], chunk: usize) -> Vec<PutRequest> {
    let mut frames = vec![
        PutRequest::ReverseIndex(reverse_index.into()),
        PutRequest::ContentHash(hash.into()),
    ];
    frames.extend(data.chunks(chunk).map(|c| PutRequest::DataChunk(c.to_vec())));
    frames
}

#[derive(Default)]
struct Collect(Vec<Bytes>);

#[async_trait]
impl ChunkSink for Collect {
    async fn send_chunk(&mut self, chunk: Bytes) -> ServiceResult<()> {
        self.0.push(chunk);
        Ok(())
    }
}

/// Accepts `limit` chunks, then rejects.
struct Rejecting {
    accepted: usize,
    limit: usize,
}

#[async_trait]
impl ChunkSink for Rejecting {
    async fn send_chunk(&mut self, _chunk: Bytes) -> ServiceResult<()> {
        if self.accepted == self.limit {
            return Err(ServiceError::Upstream("client went away".into()));
        }
        self.accepted += 1;
        Ok(())
    }
}

#[tokio::test]
async fn round_trip() {
    let h = Harness::new();
    let data: Vec<u8> = (0..100u8).collect();
    let outcome = h.put("photo-1", &data, 7).await.unwrap();
    let hash = ContentHasher::hash_hex(&data);
    assert_eq!(
        outcome,
        PutOutcome::Created {
            location: ContentLocation::new("commapp-blob", hash.as_str()).unwrap(),
            bytes: 100,
        }
    );
    assert_eq!(h.get("photo-1").await.unwrap(), data);

    let item = h.ctx.database().find_blob_item(&hash).await.unwrap().unwrap();
    assert_eq!(item.created(), NOW);
    assert_eq!(item.location().full_path(), format!("commapp-blob/{hash}"));
}

#[tokio::test]
async fn dedup_skips_upload() {
    let h = Harness::new();
    let data = b"the same bytes, twice over".to_vec();
    h.put("a", &data, 5).await.unwrap();
    let before = h.stats();

    let outcome = h.put("b", &data, 5).await.unwrap();
    assert!(matches!(outcome, PutOutcome::Deduplicated { .. }));
    let after = h.stats();
    assert_eq!(after.uploads_created, before.uploads_created);
    assert_eq!(after.parts_uploaded, before.parts_uploaded);
    assert_eq!(h.backends.storage.object_count(), 1);

    assert_eq!(h.get("b").await.unwrap(), data);
    let refs = h
        .ctx
        .database()
        .query_by_hash(&ContentHasher::hash_hex(&data))
        .await
        .unwrap();
    let mut names: Vec<&str> = refs.iter().map(|r| r.reverse_index()).collect();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn dedup_discards_trailing_field_frames() {
    let h = Harness::new();
    let data = b"payload".to_vec();
    h.put("a", &data, 3).await.unwrap();

    let mut frames = frames("b", &ContentHasher::hash_hex(&data), &data, 3);
    frames.push(PutRequest::ReverseIndex("ignored".into()));
    frames.push(PutRequest::ContentHash("ignored".into()));
    h.put_frames(frames).await.unwrap();
    assert_eq!(h.get("b").await.unwrap(), data);
    assert!(h.ctx.database().find_reverse_index_item("ignored").await.unwrap().is_none());
}

#[tokio::test]
async fn dedup_with_mismatched_bytes_is_integrity_error() {
    let h = Harness::new();
    let real = b"real content".to_vec();
    let hash = ContentHasher::hash_hex(&real);
    h.put("r1", &real, 4).await.unwrap();
    let before = h.stats();

    let err = h
        .put_frames(frames("r2", &hash, b"totally different bytes", 4))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);

    assert!(h.ctx.database().find_reverse_index_item("r2").await.unwrap().is_none());
    assert_eq!(h.stats(), before);
    assert_eq!(h.backends.storage.object_count(), 1);
    assert_eq!(h.get("r1").await.unwrap(), real);
}

#[tokio::test]
async fn dedup_with_trailing_data_is_integrity_error() {
    let h = Harness::new();
    let data = b"payload".to_vec();
    h.put("a", &data, 3).await.unwrap();

    let mut frames = frames("b", &ContentHasher::hash_hex(&data), &data, 3);
    frames.push(PutRequest::DataChunk(b"extra".to_vec()));
    let err = h.put_frames(frames).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(h.get("b").await.is_err());
}

#[tokio::test]
async fn reverse_index_is_unique() {
    let h = Harness::new();
    h.put("r", b"first", 4).await.unwrap();
    let err = h.put("r", b"second", 4).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.get("r").await.unwrap(), b"first".to_vec());
}

#[tokio::test]
async fn missing_reference_touches_no_storage() {
    let h = Harness::new();
    let err = h.get("nothing-here").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.stats(), StorageStats::default());
}

#[tokio::test]
async fn hash_mismatch_rolls_back_object() {
    let h = Harness::new();
    let wrong = ContentHasher::hash_hex(b"something else");
    let err = h
        .put_frames(frames("r", &wrong, b"actual content", 4))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);

    assert_eq!(h.backends.storage.object_count(), 0);
    assert_eq!(h.stats().objects_deleted, 1);
    assert!(h.ctx.database().find_blob_item(&wrong).await.unwrap().is_none());
    assert!(h.ctx.database().find_reverse_index_item("r").await.unwrap().is_none());
}

#[tokio::test]
async fn declared_hash_case_is_ignored() {
    let h = Harness::new();
    let data = b"mixed case".to_vec();
    let hash = ContentHasher::hash_hex(&data);
    h.put_frames(frames("lower", &hash, &data, 4)).await.unwrap();
    let outcome = h
        .put_frames(frames("upper", &hash.to_uppercase(), &data, 4))
        .await
        .unwrap();
    assert!(matches!(outcome, PutOutcome::Deduplicated { .. }));

    assert_eq!(h.backends.storage.object_count(), 1);
    assert_eq!(h.stats().uploads_created, 1);
    assert_eq!(h.ctx.database().scan_all_blob_hashes().await.unwrap(), vec![hash.clone()]);
    let upper = h.ctx.database().find_reverse_index_item("upper").await.unwrap().unwrap();
    assert_eq!(upper.content_hash(), hash);
    assert_eq!(h.get("upper").await.unwrap(), data);
}

#[tokio::test]
async fn empty_payload_is_stored() {
    let h = Harness::new();
    h.put("empty", b"", 4).await.unwrap();
    assert_eq!(h.get("empty").await.unwrap(), Vec::<u8>::new());
    assert_eq!(h.backends.storage.object_count(), 1);
}

#[tokio::test]
async fn data_before_path_is_protocol_error() {
    let h = Harness::new();
    let err = h
        .put_frames(vec![
            PutRequest::DataChunk(b"early".to_vec()),
            PutRequest::ReverseIndex("r".into()),
            PutRequest::ContentHash("h".into()),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(h.stats(), StorageStats::default());
}

#[tokio::test]
async fn duplicate_reverse_index_frame() {
    let h = Harness::new();
    let err = h
        .put_frames(vec![
            PutRequest::ReverseIndex("r".into()),
            PutRequest::ReverseIndex("r2".into()),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn missing_fields_fail_before_mutation() {
    let h = Harness::new();
    let err = h
        .put_frames(vec![PutRequest::ReverseIndex("r".into())])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .put_frames(vec![PutRequest::ContentHash("h".into())])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let tables = h.ctx.database().tables().clone();
    assert_eq!(h.backends.store.row_count(&tables.blob), 0);
    assert_eq!(h.backends.store.row_count(&tables.reverse_index), 0);
    assert_eq!(h.stats(), StorageStats::default());
}

#[tokio::test]
async fn rejecting_sink_stops_stream() {
    let h = Harness::new();
    let data = vec![9u8; 100];
    h.put("r", &data, 10).await.unwrap();
    let reads_before = h.stats().ranges_read;

    let mut sink = Rejecting { accepted: 0, limit: 2 };
    let err = GetPipeline::new(h.ctx.clone())
        .run("r", &mut sink)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(sink.accepted, 2);
    assert_eq!(h.stats().ranges_read - reads_before, 3);
}

#[tokio::test]
async fn get_chunks_fit_message_budget() {
    let h = Harness::new();
    let data = vec![1u8; 40];
    h.put("r", &data, 40).await.unwrap();
    let mut sink = Collect::default();
    GetPipeline::new(h.ctx.clone()).run("r", &mut sink).await.unwrap();
    let chunk_size = h.ctx.config().get_chunk_size();
    assert_eq!(chunk_size, 11);
    assert!(sink.0.iter().all(|c| c.len() <= chunk_size));
    assert_eq!(sink.0.len(), 4);
}

#[tokio::test]
async fn corrupt_blob_record_is_integrity_error() {
    let h = Harness::new();
    let tables = h.ctx.database().tables().clone();
    let mut row = Attributes::new();
    row.insert(BlobItem::FIELD_CONTENT_HASH.into(), AttributeValue::from("h"));
    h.backends.store.insert_raw(&tables.blob, "h", row).unwrap();
    h.ctx
        .database()
        .put_reverse_index(&blob_database::ReverseIndexItem::new("r", "h").unwrap())
        .await
        .unwrap();

    let err = h.get("r").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[tokio::test]
async fn metadata_outage_is_upstream_error() {
    let h = Harness::new();
    h.backends.store.set_unavailable(true);
    let err = h.put("r", b"data", 4).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(h.ctx.locks().is_empty());
}

#[tokio::test]
async fn concurrent_puts_of_same_content_upload_once() {
    let h = Arc::new(Harness::new());
    let data: Vec<u8> = (0..64u8).collect();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let h = h.clone();
            let data = data.clone();
            tokio::spawn(async move { h.put(&format!("ref-{i}"), &data, 9).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if let PutOutcome::Created { .. } = task.await.unwrap().unwrap() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(h.stats().uploads_created, 1);
    assert_eq!(h.backends.storage.object_count(), 1);
    for i in 0..8 {
        assert_eq!(h.get(&format!("ref-{i}")).await.unwrap(), data);
    }
}

#[tokio::test]
async fn concurrent_puts_of_same_reverse_index_admit_one() {
    let h = Arc::new(Harness::new());
    let tasks: Vec<_> = (0..6u8)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move { h.put("contested", &[i; 12], 5).await })
        })
        .collect();

    let mut ok = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::Conflict);
                conflicts += 1;
            }
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 5);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn chunking_does_not_change_stored_content(
        data in proptest::collection::vec(any::<u8>(), 0..200),
        chunk in 1usize..50,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (whole, split) = rt.block_on(async {
            let one = Harness::new();
            one.put("r", &data, data.len().max(1)).await.unwrap();
            let many = Harness::new();
            many.put("r", &data, chunk).await.unwrap();
            (one.get("r").await.unwrap(), many.get("r").await.unwrap())
        });
        prop_assert_eq!(&whole, &data);
        prop_assert_eq!(&split, &data);
    }
}
