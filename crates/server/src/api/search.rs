use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_document_id, ApiError};
use crate::state::AppState;
use crate::vector_store::SearchResult;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Semantic search
///
/// Ranks stored passages by similarity to the query without calling the LLM.
#[utoipa::path(
    post,
    path = "/search",
    tag = "Query",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Passages ranked by similarity", body = SearchResponse),
        (status = 400, description = "Empty query or missing document_id", body = super::ErrorBody),
        (status = 404, description = "Unknown document_id", body = super::ErrorBody)
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let document_id = parse_document_id(req.document_id.as_deref())?;
    let scope = state
        .pipeline
        .resolve_scope(document_id)
        .await
        .map_err(ApiError::from_query)?;
    let results = state
        .pipeline
        .retrieve(&req.query, req.k, scope)
        .await
        .map_err(ApiError::from_query)?;
    Ok(Json(SearchResponse { results }))
}
