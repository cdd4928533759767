//! Liveness and readiness endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: &'static str,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `postgres` or `memory`.
    pub store: &'static str,
    /// `shared` or `per_document`.
    pub store_mode: String,
    pub embedding_provider: String,
    pub embedding_dimensions: usize,
    pub image_embeddings: bool,
    /// Model answering `/query`, absent when no LLM is configured.
    pub llm_model: Option<String>,
}

/// Server banner
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Server is running", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "pdfqa server is running",
    })
}

/// Server health
///
/// Reports the vector store backend and which providers are ready.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Health status", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: pipeline.store_backend(),
        store_mode: pipeline.store_mode().to_string(),
        embedding_provider: state.config.embedding.provider.clone(),
        embedding_dimensions: pipeline.embedding_dimensions(),
        image_embeddings: pipeline.image_embeddings_enabled(),
        llm_model: pipeline.answer_model().map(str::to_string),
    })
}
