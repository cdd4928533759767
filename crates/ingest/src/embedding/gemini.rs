use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::traits::{validate_embeddings, Embedder, EmbeddingError};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Generative Language embedding backend (`batchEmbedContents`).
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// `model` may be given with or without the `models/` prefix.
    pub fn new(api_key: String, model: String, dimensions: usize) -> Self {
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{model}")
        };
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            dimensions,
        }
    }

    async fn embed(&self, texts: &[&str], task_type: TaskType) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = build_request_body(&self.model, texts, task_type);
        let response = self
            .client
            .post(format!("{}/{}:batchEmbedContents", BASE_URL, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let parsed: BatchEmbedResponse = response.json().await?;
        let embeddings: Vec<Vec<f32>> = parsed.embeddings.into_iter().map(|e| e.values).collect();
        validate_embeddings(&embeddings, texts.len(), self.dimensions)?;
        Ok(embeddings)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

fn build_request_body(model: &str, texts: &[&str], task_type: TaskType) -> Value {
    let requests: Vec<Value> = texts
        .iter()
        .map(|text| {
            json!({
                "model": model,
                "content": { "parts": [{ "text": text }] },
                "taskType": task_type,
            })
        })
        .collect();
    json!({ "requests": requests })
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed(texts, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text], TaskType::RetrievalQuery).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch { expected: 1, actual: 0 })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_gets_models_prefix() {
        let e = GeminiEmbedder::new("k".into(), "embedding-001".into(), 768);
        assert_eq!(e.model, "models/embedding-001");
        let e = GeminiEmbedder::new("k".into(), "models/text-embedding-004".into(), 768);
        assert_eq!(e.model, "models/text-embedding-004");
    }

    #[test]
    fn request_body_has_one_request_per_text() {
        let body = build_request_body("models/embedding-001", &["a", "b"], TaskType::RetrievalDocument);
        let requests = body["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "models/embedding-001");
        assert_eq!(requests[1]["content"]["parts"][0]["text"], "b");
        assert_eq!(requests[0]["taskType"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn query_task_type_serializes() {
        let body = build_request_body("models/embedding-001", &["q"], TaskType::RetrievalQuery);
        assert_eq!(body["requests"][0]["taskType"], "RETRIEVAL_QUERY");
    }

    #[test]
    fn response_parses_values() {
        let raw = r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#;
        let parsed: BatchEmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        let e = GeminiEmbedder::new("k".into(), "embedding-001".into(), 768);
        assert!(e.embed_batch(&[]).await.unwrap().is_empty());
    }
}
