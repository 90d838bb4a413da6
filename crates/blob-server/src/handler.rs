use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;

use blob_protocol::{HealthResponse, InfoResponse};

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Storage layout and message limits of this server.
pub async fn info_handler(State(info): State<Arc<InfoResponse>>) -> Json<InfoResponse> {
    Json(info.as_ref().clone())
}
