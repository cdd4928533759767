use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Image encoding failed: {0}")]
    Image(String),

    #[error("Embedding provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for text embedding backends (Gemini, OpenAI, Ollama).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts, returning one vector per input (in order).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a search query. Backends with asymmetric retrieval models
    /// override this to use their query task type.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text]).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len() + 1,
            }),
        }
    }

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;
}

/// Check a provider response: one vector per input, each of the configured size.
pub(crate) fn validate_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimensions: usize,
) -> Result<(), EmbeddingError> {
    if embeddings.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: embeddings.len(),
        });
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimensions,
            actual: bad.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    #[async_trait]
    impl Embedder for Fixed {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| vec![t.len() as f32; self.0]).collect())
        }

        fn dimensions(&self) -> usize {
            self.0
        }
    }

    #[tokio::test]
    async fn default_query_embedding_uses_batch() {
        let v = Fixed(3).embed_query("abcd").await.unwrap();
        assert_eq!(v, vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn validation_catches_wrong_count() {
        let err = validate_embeddings(&[vec![0.0; 2]], 2, 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::CountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn validation_catches_wrong_dimensions() {
        let err = validate_embeddings(&[vec![0.0; 2], vec![0.0; 3]], 2, 2).unwrap_err();
        assert!(matches!(err, EmbeddingError::DimensionMismatch { expected: 2, actual: 3 }));
    }
}
