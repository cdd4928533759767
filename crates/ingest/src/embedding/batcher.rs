use std::sync::Arc;

use tracing::debug;

use super::traits::{Embedder, EmbeddingError};

/// Collects keyed texts and embeds them in fixed-size batches.
///
/// Keys travel with their text so callers can match vectors back to chunks
/// without relying on positional bookkeeping.
pub struct EmbeddingBatcher<K> {
    buffer: Vec<(K, String)>,
    batch_size: usize,
    embedder: Arc<dyn Embedder>,
}

impl<K> EmbeddingBatcher<K> {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            embedder,
        }
    }

    /// Add an item to the batch. Returns embeddings if the batch is full (auto-flush).
    pub async fn add(&mut self, key: K, text: String) -> Result<Option<Vec<(K, Vec<f32>)>>, EmbeddingError> {
        self.buffer.push((key, text));
        if self.buffer.len() >= self.batch_size {
            Ok(Some(self.flush().await?))
        } else {
            Ok(None)
        }
    }

    /// Force-flush remaining items.
    pub async fn flush(&mut self) -> Result<Vec<(K, Vec<f32>)>, EmbeddingError> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        let batch: Vec<(K, String)> = self.buffer.drain(..).collect();
        let texts: Vec<&str> = batch.iter().map(|(_, t)| t.as_str()).collect();
        debug!("Embedding batch of {} texts", texts.len());
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: batch.len(),
                actual: embeddings.len(),
            });
        }

        Ok(batch
            .into_iter()
            .zip(embeddings)
            .map(|((key, _), emb)| (key, emb))
            .collect())
    }

    /// Embed everything in `items`, batch by batch, preserving order.
    ///
    /// The returned future is `Send` whenever `K` is.
    pub async fn embed_all(&mut self, items: Vec<(K, String)>) -> Result<Vec<(K, Vec<f32>)>, EmbeddingError> {
        let mut out = Vec::new();
        for (key, text) in items {
            if let Some(done) = self.add(key, text).await? {
                out.extend(done);
            }
        }
        out.extend(self.flush().await?);
        Ok(out)
    }

    /// Number of items currently buffered.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
