use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use blob_protocol::{endpoints, InfoResponse};

use crate::config::ServerConfig;
use crate::handler;

/// Build the admin router.
pub fn build_router(config: &ServerConfig) -> Router {
    let info = Arc::new(InfoResponse {
        bucket: config.bucket.clone(),
        blob_table: config.tables.blob.clone(),
        reverse_index_table: config.tables.reverse_index.clone(),
        min_chunk_size: config.min_chunk_size,
        max_message_size: config.max_message_size,
    });
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::INFO, get(handler::info_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(info)
}
