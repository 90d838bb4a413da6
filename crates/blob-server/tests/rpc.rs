//! Put and get calls through a real TCP listener and `BlobClient`.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use blob_crypto::ContentHasher;
use blob_protocol::{status, BlobClient, ProtocolError, PutRequest};
use blob_server::{BlobServer, InMemoryBackends, ServerConfig, ServerResult};

struct Running {
    addr: SocketAddr,
    backends: InMemoryBackends,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<ServerResult<()>>,
}

impl Running {
    async fn start() -> Self {
        let config = ServerConfig {
            min_chunk_size: 1024,
            ..ServerConfig::default()
        };
        let backends = InMemoryBackends::new(&config);
        let server = BlobServer::new(backends.context(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .serve_rpc(listener, async {
                    let _ = stopped.await;
                })
                .await
        });
        Self {
            addr,
            backends,
            stop: Some(stop),
            task,
        }
    }

    async fn client(&self) -> BlobClient {
        BlobClient::connect(self.addr).await.unwrap()
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

fn remote_message(err: ProtocolError) -> String {
    match err {
        ProtocolError::RemoteError { code, message } => {
            assert_eq!(code, status::INTERNAL);
            message
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn put_then_get_over_tcp() {
    let server = Running::start().await;
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let hash = ContentHasher::hash_hex(&data);

    let mut client = server.client().await.with_chunk_size(700);
    client.put("doc-1", &hash, &data).await.unwrap();
    assert_eq!(client.get("doc-1").await.unwrap(), data);

    let stats = server.backends.storage.stats();
    assert_eq!(stats.uploads_completed, 1);
    assert!(stats.parts_uploaded > 1);
    server.shutdown().await;
}

#[tokio::test]
async fn second_put_of_same_content_is_deduplicated() {
    let server = Running::start().await;
    let data = vec![42u8; 3000];
    let hash = ContentHasher::hash_hex(&data);

    let mut first = server.client().await;
    first.put("a", &hash, &data).await.unwrap();
    let uploads = server.backends.storage.stats().uploads_created;

    let mut second = server.client().await;
    second.put("b", &hash, &data).await.unwrap();
    assert_eq!(server.backends.storage.stats().uploads_created, uploads);
    assert_eq!(second.get("b").await.unwrap(), data);
    server.shutdown().await;
}

#[tokio::test]
async fn failed_calls_leave_connection_usable() {
    let server = Running::start().await;
    let mut client = server.client().await;

    let err = client.get("unknown").await.unwrap_err();
    assert!(remote_message(err).contains("not found"));

    let err = client
        .put_frames(vec![
            PutRequest::DataChunk(b"too early".to_vec()),
            PutRequest::ReverseIndex("r".into()),
            PutRequest::ContentHash("h".into()),
            PutRequest::DataChunk(b"ignored".to_vec()),
        ])
        .await
        .unwrap_err();
    assert!(remote_message(err).contains("before the storage path was established"));

    let data = b"after the failures".to_vec();
    client
        .put("r", &ContentHasher::hash_hex(&data), &data)
        .await
        .unwrap();
    assert_eq!(client.get("r").await.unwrap(), data);
    server.shutdown().await;
}

#[tokio::test]
async fn conflict_and_integrity_errors_reach_client() {
    let server = Running::start().await;
    let mut client = server.client().await;
    let data = b"original".to_vec();
    client
        .put("taken", &ContentHasher::hash_hex(&data), &data)
        .await
        .unwrap();

    let other = b"replacement".to_vec();
    let err = client
        .put("taken", &ContentHasher::hash_hex(&other), &other)
        .await
        .unwrap_err();
    assert!(remote_message(err).contains("already exists"));

    let err = client
        .put("fresh", &ContentHasher::hash_hex(b"not it"), b"some bytes")
        .await
        .unwrap_err();
    assert!(remote_message(err).contains("mismatch"));
    assert_eq!(client.get("taken").await.unwrap(), data);
    server.shutdown().await;
}

#[tokio::test]
async fn empty_blob_over_tcp() {
    let server = Running::start().await;
    let mut client = server.client().await;
    client
        .put("nothing", &ContentHasher::hash_hex(b""), b"")
        .await
        .unwrap();
    assert!(client.get("nothing").await.unwrap().is_empty());
    server.shutdown().await;
}
