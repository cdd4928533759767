use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    #[schema(value_type = String)]
    pub document_id: Uuid,
    pub chunk_count: usize,
    pub page_count: usize,
    pub image_count: usize,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("Upload exceeds the size limit: {}", e.body_text()))
    } else {
        ApiError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

/// Upload a PDF
///
/// Accepts multipart/form-data with a `file` field. The PDF is extracted,
/// chunked, embedded, and added to the vector store.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Documents",
    request_body(content_type = "multipart/form-data", description = "PDF in the `file` field"),
    responses(
        (status = 200, description = "PDF uploaded and processed", body = UploadResponse),
        (status = 400, description = "Not a PDF, or no extractable text", body = super::ErrorBody),
        (status = 413, description = "Upload too large", body = super::ErrorBody),
        (status = 500, description = "Processing or storage failed", body = super::ErrorBody)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        file = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest(format!("Uploaded file '{filename}' is empty")));
    }
    info!("Received upload '{}' ({} bytes)", filename, bytes.len());

    let report = state
        .pipeline
        .ingest(bytes.to_vec(), &filename)
        .await
        .map_err(ApiError::from_ingest)?;

    Ok(Json(UploadResponse {
        message: "PDF uploaded and processed",
        filename: report.filename,
        document_id: report.document_id,
        chunk_count: report.chunk_count,
        page_count: report.page_count,
        image_count: report.image_count,
    }))
}
