use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message, Role};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        // Gemini takes the system prompt as a separate system_instruction.
        let system_msg = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                }))
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        if !system_msg.is_empty() {
            body["system_instruction"] = json!({
                "parts": [{ "text": system_msg }],
            });
        }

        body
    }

    /// Concatenated text parts of the first candidate.
    fn parse_response(resp: &serde_json::Value) -> Result<String, LlmError> {
        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| {
                let reason = resp["promptFeedback"]["blockReason"]
                    .as_str()
                    .or_else(|| resp["candidates"][0]["finishReason"].as_str())
                    .unwrap_or("missing candidates[0].content.parts");
                LlmError::ParseError(reason.to_string())
            })?;

        Ok(parts.iter().filter_map(|p| p["text"].as_str()).collect::<Vec<_>>().join(""))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, messages: Vec<Message>, temperature: f32, max_tokens: u32) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", BASE_URL, self.model);
        let body = Self::build_request_body(&messages, temperature, max_tokens);

        debug!("Gemini request to model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        Self::parse_response(&resp)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
