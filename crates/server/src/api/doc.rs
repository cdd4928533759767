//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pdfqa API",
        version = "0.1.0",
        description = "Question answering over uploaded PDFs with retrieval-augmented generation.",
    ),
    tags(
        (name = "Health", description = "Server liveness and provider readiness"),
        (name = "Documents", description = "PDF upload, listing, and deletion"),
        (name = "Query", description = "Semantic search and LLM answers over uploaded documents"),
    ),
    paths(
        crate::api::health::root,
        crate::api::health::health,
        crate::api::upload::upload,
        crate::api::documents::list_documents,
        crate::api::documents::delete_document,
        crate::api::query::query,
        crate::api::search::search,
    ),
    components(schemas(
        crate::api::ErrorBody,
        crate::api::RootResponse,
        crate::api::HealthResponse,
        crate::api::UploadResponse,
        crate::api::DocumentListResponse,
        crate::api::QueryInput,
        crate::api::SearchRequest,
        crate::api::SearchResponse,
        crate::pipeline::QueryAnswer,
        crate::pipeline::SourceDocument,
        crate::vector_store::DocumentRecord,
        crate::vector_store::SearchResult,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in ["/", "/health", "/upload", "/documents", "/documents/{id}", "/query", "/search"] {
            assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
        }
    }
}
