mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{build_pdf, HarnessBuilder, CANNED_ANSWER, ENERGY_PAGES};
use http_body_util::BodyExt;
use pdfqa_server::router::build_router;
use pdfqa_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "pdfqa-test-boundary";

fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(path: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body("file", filename, bytes)))
        .unwrap()
}

fn json_request(method: Method, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_request(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, json)
}

fn app(state: Arc<AppState>) -> Router {
    build_router(state)
}

async fn upload_energy(app: &Router) -> String {
    let (status, body) = send(app, upload_request("/upload/", "energy.pdf", &build_pdf(&ENERGY_PAGES))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["document_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn root_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let (status, body) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pdfqa server is running");

    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["store_mode"], "shared");
    assert_eq!(body["llm_model"], "stub-llm");
    assert_eq!(body["image_embeddings"], false);
}

#[tokio::test]
async fn upload_then_list_documents() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let (status, body) = send(&app, upload_request("/upload", "energy.pdf", &build_pdf(&ENERGY_PAGES))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "PDF uploaded and processed");
    assert_eq!(body["filename"], "energy.pdf");
    assert_eq!(body["page_count"], 3);
    assert_eq!(body["chunk_count"], 3);

    let (status, body) = send(&app, Request::get("/documents").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["filename"], "energy.pdf");
    assert_eq!(docs[0]["chunk_count"], 3);
}

#[tokio::test]
async fn upload_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let (status, body) = send(&app, upload_request("/upload/", "notes.txt", b"plain notes")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("PDF"));
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload/")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body("attachment", "energy.pdf", b"%PDF-1.5")))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let big = vec![b'x'; 2 * 1024 * 1024];
    let (status, body) = send(&app, upload_request("/upload/", "big.pdf", &big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn query_form_returns_answer_and_sources() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());
    upload_energy(&app).await;

    let (status, body) = send(&app, form_request("/query", "query=what+do+wind+turbines+do&document_id=")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["answer"], CANNED_ANSWER);
    let documents = body["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["source"], "energy.pdf");
    assert_eq!(documents[0]["page"], 2);
    assert!(documents[0]["similarity"].is_number());
}

#[tokio::test]
async fn blank_form_k_uses_configured_top_k() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());
    upload_energy(&app).await;

    let (status, body) = send(&app, form_request("/query", "query=wind&k=")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["documents"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, form_request("/query", "query=wind&k=1")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, form_request("/query", "query=wind&k=many")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_accepts_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());
    upload_energy(&app).await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/query", serde_json::json!({"query": "yeast and bread", "k": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["page"], 3);
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let (status, body) = send(&app, form_request("/query", "query=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn query_without_llm_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().without_llm().build(dir.path()).into_state());

    let (status, body) = send(&app, form_request("/query", "query=hello")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("LLM"));
}

#[tokio::test]
async fn per_document_query_needs_document_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().per_document().build(dir.path()).into_state());
    let id = upload_energy(&app).await;

    let (status, _) = send(&app, form_request("/query", "query=wind")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, form_request("/query", &format!("query=wind&document_id={id}"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["documents"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["document_id"] == id.as_str()));

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, form_request("/query", &format!("query=wind&document_id={missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, form_request("/query", "query=wind&document_id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_ranks_without_generation() {
    let dir = tempfile::tempdir().unwrap();
    let harness = HarnessBuilder::new().build(dir.path());
    let prompts = harness.llm.prompts.clone();
    let app = app(harness.into_state());
    upload_energy(&app).await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/search", serde_json::json!({"query": "solar panels sunlight", "k": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["page_number"], 1);
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_document_then_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());
    let id = upload_energy(&app).await;

    let delete = |id: String| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/documents/{id}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, delete(id.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, delete(id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, body) = send(&app, Request::get("/documents").body(Body::empty()).unwrap()).await;
    assert!(body["documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(HarnessBuilder::new().build(dir.path()).into_state());

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/query")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
