use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;
use tracing::debug;

use super::traits::{Embedder, EmbeddingError};

/// LRU cache mapping text hash to embedding vector.
pub struct EmbeddingCache {
    cache: LruCache<u64, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    fn hash_text(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Look up a cached embedding by text.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        let key = Self::hash_text(text);
        if let Some(vec) = self.cache.get(&key) {
            self.hits += 1;
            Some(vec.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store an embedding for a text.
    pub fn put(&mut self, text: &str, embedding: Vec<f32>) {
        let key = Self::hash_text(text);
        self.cache.put(key, embedding);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Embedder decorator that answers repeated texts from an [`EmbeddingCache`].
///
/// Only the misses of a batch reach the inner embedder. Queries are cached
/// under a separate key space since some backends embed them differently.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
        }
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut EmbeddingCache) -> T) -> T {
        let mut guard = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

fn query_key(text: &str) -> String {
    format!("\u{0}query\u{0}{text}")
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results: Vec<Option<Vec<f32>>> = self.with_cache(|c| texts.iter().map(|t| c.get(t)).collect());

        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.is_none().then_some(i))
            .collect();

        if !missing.is_empty() {
            let batch: Vec<&str> = missing.iter().map(|&i| texts[i]).collect();
            let fresh = self.inner.embed_batch(&batch).await?;
            if fresh.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: fresh.len(),
                });
            }
            self.with_cache(|c| {
                for (&i, vector) in missing.iter().zip(fresh) {
                    c.put(texts[i], vector.clone());
                    results[i] = Some(vector);
                }
            });
        }
        let hit_rate = self.with_cache(|c| c.hit_rate());
        debug!(
            "embedding cache: {} of {} texts served from cache (lifetime hit rate {:.2})",
            texts.len() - missing.len(),
            texts.len(),
            hit_rate
        );

        Ok(results.into_iter().flatten().collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = query_key(text);
        if let Some(hit) = self.with_cache(|c| c.get(&key)) {
            return Ok(hit);
        }
        let vector = self.inner.embed_query(text).await?;
        self.with_cache(|c| c.put(&key, vector.clone()));
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_hit_and_miss() {
        let mut cache = EmbeddingCache::new(100);

        assert!(cache.get("hello").is_none());
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 0);

        cache.put("hello", vec![1.0, 2.0, 3.0]);
        let result = cache.get("hello").unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn cache_eviction() {
        let mut cache = EmbeddingCache::new(2);

        cache.put("a", vec![1.0]);
        cache.put("b", vec![2.0]);
        cache.put("c", vec![3.0]); // evicts "a"

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let mut cache = EmbeddingCache::new(0);
        cache.put("a", vec![1.0]);
        assert_eq!(cache.len(), 1);
    }

    struct CountingEmbedder {
        texts_seen: AtomicUsize,
        queries_seen: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 0.0]).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.queries_seen.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.0, text.len() as f32])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            texts_seen: AtomicUsize::new(0),
            queries_seen: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn only_misses_reach_inner_embedder() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 16);

        let first = cached.embed_batch(&["a", "bb"]).await.unwrap();
        assert_eq!(first, vec![vec![1.0, 0.0], vec![2.0, 0.0]]);
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 2);

        let second = cached.embed_batch(&["bb", "ccc", "a"]).await.unwrap();
        assert_eq!(second, vec![vec![2.0, 0.0], vec![3.0, 0.0], vec![1.0, 0.0]]);
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 3);
        assert_eq!(cached.dimensions(), 2);
    }

    #[tokio::test]
    async fn queries_cached_separately_from_documents() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 16);

        cached.embed_batch(&["same"]).await.unwrap();
        let q = cached.embed_query("same").await.unwrap();
        assert_eq!(q, vec![0.0, 4.0]);
        cached.embed_query("same").await.unwrap();
        assert_eq!(inner.queries_seen.load(Ordering::SeqCst), 1);
    }
}
