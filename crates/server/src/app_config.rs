//! Application configuration builders.
//!
//! Constructs the vector store, embedders, and answer generator from `Config`.

use std::sync::Arc;

use pdfqa_core::Config;
use pdfqa_ingest::embedding::{
    CachedEmbedder, ClipEmbedder, Embedder, EmbeddingError, GeminiEmbedder, ImageEmbedder, OllamaEmbedder,
    OpenAiEmbedder,
};
use pdfqa_llm::AnswerGenerator;
use tracing::{info, warn};

use crate::db;
use crate::vector_store::{MemoryVectorStore, PgVectorStore, VectorStore};

/// OpenAI embedding model used when `EMBEDDING_MODEL` still names a Gemini model.
const OPENAI_DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Load configuration from `.env` and environment variables.
pub fn load_config() -> Config {
    pdfqa_core::config::load_dotenv();
    Config::from_env()
}

/// PostgreSQL when configured and reachable, otherwise in-memory.
pub async fn build_store(config: &Config) -> Arc<dyn VectorStore> {
    match db::init_pg_pool(&config.postgres).await {
        Some(pool) => Arc::new(PgVectorStore::new(pool)),
        None => Arc::new(MemoryVectorStore::new()),
    }
}

/// Build the text embedder from config, wrapped in an LRU cache unless
/// `EMBEDDING_CACHE_SIZE=0`.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let dims = config.embedding.dimensions;
    let embedder: Arc<dyn Embedder> = match config.embedding.provider.as_str() {
        "gemini" | "google" => {
            let api_key = config
                .llm
                .google_api_key
                .clone()
                .ok_or_else(|| EmbeddingError::NotConfigured("GOOGLE_API_KEY not set".into()))?;
            Arc::new(GeminiEmbedder::new(api_key, config.embedding.model.clone(), dims))
        }
        "openai" => {
            let api_key = config
                .llm
                .openai_api_key
                .clone()
                .ok_or_else(|| EmbeddingError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let model = if config.embedding.model.starts_with("models/") {
                OPENAI_DEFAULT_EMBEDDING_MODEL.to_string()
            } else {
                config.embedding.model.clone()
            };
            Arc::new(OpenAiEmbedder::new(api_key, model, config.llm.openai_base_url.clone(), dims))
        }
        "ollama" => Arc::new(OllamaEmbedder::new(
            config.ollama.url.clone(),
            config.ollama.embedding_model.clone(),
            dims,
        )),
        other => {
            return Err(EmbeddingError::NotConfigured(format!(
                "unknown embedding provider '{other}'"
            )))
        }
    };
    info!(
        "Embedding provider ready: {} (dims: {}, cache: {})",
        config.embedding.provider, dims, config.embedding.cache_size
    );

    if config.embedding.cache_size == 0 {
        return Ok(embedder);
    }
    Ok(Arc::new(CachedEmbedder::new(embedder, config.embedding.cache_size)))
}

/// CLIP image embedder, or None when `IMAGE_EMBEDDINGS` is off.
pub fn build_image_embedder(config: &Config) -> Option<Arc<dyn ImageEmbedder>> {
    let cfg = &config.image_embedding;
    if !cfg.enabled {
        return None;
    }
    info!("Image embeddings enabled: {} at {} (dims: {})", cfg.model, cfg.url, cfg.dimensions);
    Some(Arc::new(ClipEmbedder::new(cfg.url.clone(), cfg.model.clone(), cfg.dimensions)))
}

/// Answer generator, or None when no LLM provider can be built.
pub fn build_answer_generator(config: &Config) -> Option<AnswerGenerator> {
    match AnswerGenerator::from_config(&config.llm, &config.ollama) {
        Ok(generator) => {
            info!("LLM answer generator ready (provider: {})", config.llm.provider);
            Some(generator)
        }
        Err(e) => {
            warn!("LLM answer generator not available: {} (POST /query will return 503)", e);
            None
        }
    }
}
