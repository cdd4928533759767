//! JSON error envelope shared by every handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use pdfqa_ingest::document::ExtractionError;

use crate::pipeline::PipelineError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::ServiceUnavailable(m)
            | ApiError::Internal(m) => m,
        }
    }

    /// Map a failed upload. Bad input is the client's fault; anything after
    /// extraction succeeded is reported as a storage failure.
    pub fn from_ingest(err: PipelineError) -> Self {
        match err {
            PipelineError::Extraction(ExtractionError::UnsupportedType(t)) => {
                ApiError::BadRequest(format!("Only PDF files are accepted (got '{t}')"))
            }
            PipelineError::Extraction(ExtractionError::PdfError(e)) => {
                ApiError::BadRequest(format!("Error processing PDF: {e}"))
            }
            e @ (PipelineError::NoText(_) | PipelineError::NoChunks(_)) => ApiError::BadRequest(e.to_string()),
            e @ (PipelineError::Extraction(_) | PipelineError::Io(_) | PipelineError::Task(_)) => {
                ApiError::Internal(format!("Error processing PDF: {e}"))
            }
            e => ApiError::Internal(format!("Error adding documents: {e}")),
        }
    }

    /// Map a failed query or search.
    pub fn from_query(err: PipelineError) -> Self {
        match err {
            e @ (PipelineError::EmptyQuery | PipelineError::DocumentRequired) => ApiError::BadRequest(e.to_string()),
            e @ PipelineError::DocumentNotFound(_) => ApiError::NotFound(e.to_string()),
            e @ PipelineError::LlmUnavailable => ApiError::ServiceUnavailable(e.to_string()),
            e => ApiError::Internal(format!("Query failed: {e}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self.message());
        } else {
            warn!("{} {}", status.as_u16(), self.message());
        }
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
