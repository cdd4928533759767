use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::combine::l2_normalize;
use super::traits::{validate_embeddings, EmbeddingError};
use crate::document::encode_png_base64;

/// Trait for image embedding backends.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    /// Embed images, returning one unit-length vector per image (in order).
    async fn embed_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;
}

/// CLIP vision encoder served over HTTP.
///
/// Images are sent as base64 PNG to `POST {url}/embed/image`.
pub struct ClipEmbedder {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl ClipEmbedder {
    pub fn new(url: String, model: String, dimensions: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: url.trim_end_matches('/').to_string(),
            model,
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct ClipRequest<'a> {
    model: &'a str,
    images: Vec<String>,
}

#[derive(Deserialize)]
struct ClipResponse {
    embeddings: Vec<Vec<f32>>,
}

fn encode_images(images: &[RgbImage]) -> Result<Vec<String>, EmbeddingError> {
    images
        .iter()
        .map(|img| {
            encode_png_base64(&DynamicImage::ImageRgb8(img.clone())).map_err(|e| EmbeddingError::Image(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl ImageEmbedder for ClipEmbedder {
    async fn embed_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let request = ClipRequest {
            model: &self.model,
            images: encode_images(images)?,
        };

        let response = self
            .client
            .post(format!("{}/embed/image", self.url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let parsed: ClipResponse = response.json().await?;
        validate_embeddings(&parsed.embeddings, images.len(), self.dimensions)?;
        Ok(parsed.embeddings.into_iter().map(l2_normalize).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
