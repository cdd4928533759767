//! Retrieval-augmented question answering.
//!
//! `/query` accepts the question as a URL-encoded or multipart form (what the
//! browser client sends) or as JSON.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::{de, Deserialize, Deserializer};

use super::{parse_document_id, ApiError};
use crate::pipeline::QueryAnswer;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct QueryInput {
    pub query: String,
    /// Restrict retrieval to one uploaded document. Required when
    /// `STORE_MODE=per_document`.
    #[serde(default)]
    pub document_id: Option<String>,
    /// Number of passages to retrieve, defaults to `RETRIEVAL_TOP_K`.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub k: Option<usize>,
}

/// Parse a `k` field; blank means "use the default".
fn parse_k(raw: &str) -> Result<Option<usize>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| format!("k must be a positive integer, got '{raw}'"))
}

/// Forms send `k` as text (possibly empty), JSON as a number.
fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawK {
        Number(usize),
        Text(String),
    }

    match Option::<RawK>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawK::Number(k)) => Ok(Some(k)),
        Some(RawK::Text(text)) => parse_k(&text).map_err(de::Error::custom),
    }
}

impl<S> FromRequest<S> for QueryInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(input) = Json::<QueryInput>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(input)
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Form(input) = Form::<QueryInput>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(input)
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<QueryInput, ApiError> {
    let mut input = QueryInput::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "query" => input.query = value,
            "document_id" => input.document_id = Some(value),
            "k" => input.k = parse_k(&value).map_err(ApiError::BadRequest)?,
            _ => {}
        }
    }
    Ok(input)
}

/// Ask a question
///
/// Retrieves the passages most similar to the question and has the LLM
/// answer from them.
#[utoipa::path(
    post,
    path = "/query",
    tag = "Query",
    request_body(content = QueryInput, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Answer with source passages", body = QueryAnswer),
        (status = 400, description = "Empty query or missing document_id", body = super::ErrorBody),
        (status = 404, description = "Unknown document_id", body = super::ErrorBody),
        (status = 500, description = "Query failed", body = super::ErrorBody),
        (status = 503, description = "No LLM configured", body = super::ErrorBody)
    )
)]
pub async fn query(State(state): State<Arc<AppState>>, input: QueryInput) -> Result<Json<QueryAnswer>, ApiError> {
    let document_id = parse_document_id(input.document_id.as_deref())?;
    let scope = state
        .pipeline
        .resolve_scope(document_id)
        .await
        .map_err(ApiError::from_query)?;
    let answer = state
        .pipeline
        .ask(&input.query, input.k, scope)
        .await
        .map_err(ApiError::from_query)?;
    Ok(Json(answer))
}
