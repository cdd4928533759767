//! HTTP endpoint modules.
//!
//! Handlers are thin: they decode the request, call into `RagPipeline`, and
//! map `PipelineError` onto `ApiError`.

pub mod doc;
mod documents;
mod error;
mod health;
mod query;
mod search;
mod upload;

use uuid::Uuid;

pub use documents::{delete_document, list_documents, DocumentListResponse};
pub use error::{ApiError, ErrorBody};
pub use health::{health, root, HealthResponse, RootResponse};
pub use query::{query, QueryInput};
pub use search::{search, SearchRequest, SearchResponse};
pub use upload::{upload, UploadResponse};

/// Parse an optional `document_id` field. Blank counts as absent.
pub(crate) fn parse_document_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid document_id '{s}'"))),
    }
}
