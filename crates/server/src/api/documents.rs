use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;
use crate::state::AppState;
use crate::vector_store::DocumentRecord;

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentRecord>,
}

/// List uploaded documents
#[utoipa::path(
    get,
    path = "/documents",
    tag = "Documents",
    responses((status = 200, description = "Documents with chunk counts, newest first", body = DocumentListResponse))
)]
pub async fn list_documents(State(state): State<Arc<AppState>>) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state
        .pipeline
        .list_documents()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to list documents: {e}")))?;
    Ok(Json(DocumentListResponse { documents }))
}

/// Delete a document
///
/// Removes the document, its chunks, and the stored PDF.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such document", body = super::ErrorBody)
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .pipeline
        .delete(id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to delete document: {e}")))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Document {id} not found")))
    }
}
