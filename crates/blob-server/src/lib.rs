//! Blob service server.
//!
//! Accepts streaming put and get calls over TCP, deduplicates content by
//! hash, and records reverse index bindings in the metadata store. A small
//! admin HTTP router reports health and configuration.
//!
//! # Modules
//!
//! - [`put`]: [`PutPipeline`] handles frame ordering, dedup decision, multipart
//!   upload, integrity check, metadata commit
//! - [`get`]: [`GetPipeline`] handles reverse index resolution and chunked
//!   streaming into a [`ChunkSink`]
//! - [`context`]: [`ServiceContext`] shared by all calls
//! - [`locks`]: [`KeyedLocks`] serializing first writers per content hash
//! - [`server`]: [`BlobServer`], the RPC accept loop and admin listener

pub mod config;
pub mod context;
pub mod error;
pub mod get;
pub mod handler;
pub mod locks;
pub mod put;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use context::{InMemoryBackends, ServiceContext};
pub use error::{ErrorKind, ServerError, ServerResult, ServiceError, ServiceResult};
pub use get::{ChunkSink, GetPipeline};
pub use locks::{KeyGuard, KeyedLocks};
pub use put::{PutOutcome, PutPipeline};
pub use server::BlobServer;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn app() -> axum::Router {
        router::build_router(&ServerConfig {
            bucket: "test-bucket".into(),
            ..ServerConfig::default()
        })
    }

    async fn get_json(uri: &str) -> serde_json::Value {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let json = get_json("/v1/health").await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["protocol_version"], blob_protocol::PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn info_endpoint() {
        let json = get_json("/v1/info").await;
        assert_eq!(json["bucket"], "test-bucket");
        assert_eq!(json["blob_table"], "blob-service-blob");
        assert_eq!(json["max_message_size"], blob_protocol::MAX_MESSAGE_SIZE);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }
}
