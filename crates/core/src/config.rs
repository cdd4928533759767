use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub postgres: PostgresConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub image_embedding: ImageEmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PDFQA_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PDFQA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            embedding: EmbeddingConfig::from_env_profiled(p),
            image_embedding: ImageEmbeddingConfig::from_env_profiled(p),
            chunking: ChunkingConfig::from_env_profiled(p),
            retrieval: RetrievalConfig::from_env_profiled(p),
        }
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), crate::PdfqaError> {
        if self.chunking.chunk_size == 0 {
            return Err(crate::PdfqaError::Config("CHUNK_SIZE must be greater than 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(crate::PdfqaError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(crate::PdfqaError::Config("RETRIEVAL_TOP_K must be at least 1".into()));
        }
        if self.embedding.dimensions == 0 {
            return Err(crate::PdfqaError::Config("EMBEDDING_DIMENSIONS must be greater than 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(crate::PdfqaError::Config("EMBEDDING_BATCH_SIZE must be at least 1".into()));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:     {}:{}, cors={}", self.server.host, self.server.port, self.server.cors_origins.join(","));
        tracing::info!("  storage:    data_dir={}, uploads={}", self.storage.data_dir.display(), self.storage.upload_dir.display());
        tracing::info!(
            "  postgres:   {}",
            if self.postgres.is_configured() {
                format!("host={}, db={}", self.postgres.host, self.postgres.database)
            } else {
                "(not configured, in-memory store)".to_string()
            }
        );
        tracing::info!("  llm:        provider={}, model={}", self.llm.provider, self.llm.model_name(&self.ollama));
        tracing::info!("  embedding:  provider={}, model={}, dims={}", self.embedding.provider, self.embedding.model, self.embedding.dimensions);
        tracing::info!(
            "  images:     enabled={}, dims={}",
            self.image_embedding.enabled, self.image_embedding.dimensions
        );
        tracing::info!("  chunking:   size={}, overlap={}", self.chunking.chunk_size, self.chunking.chunk_overlap);
        tracing::info!("  retrieval:  k={}, mode={}", self.retrieval.top_k, self.retrieval.store_mode);
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": {
                "host": self.server.host,
                "port": self.server.port,
                "cors_origins": self.server.cors_origins,
                "max_upload_mb": self.server.max_upload_mb,
            },
            "storage": { "data_dir": self.storage.data_dir, "upload_dir": self.storage.upload_dir },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model_name(&self.ollama),
                "temperature": self.llm.temperature,
                "configured": self.llm.is_configured(),
            },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "batch_size": self.embedding.batch_size,
            },
            "image_embedding": {
                "enabled": self.image_embedding.enabled,
                "url": self.image_embedding.url,
                "model": self.image_embedding.model,
                "dimensions": self.image_embedding.dimensions,
            },
            "chunking": { "chunk_size": self.chunking.chunk_size, "chunk_overlap": self.chunking.chunk_overlap },
            "retrieval": { "top_k": self.retrieval.top_k, "store_mode": self.retrieval.store_mode },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_mb: usize,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let cors_origins = profiled_env_or(p, "CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 8000),
            cors_origins,
            max_upload_mb: profiled_env_parse(p, "MAX_UPLOAD_MB", 200),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Uploaded PDFs are kept here as `{uuid}_{filename}`.
    pub upload_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let upload_dir = profiled_env_opt(p, "UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));
        Self { data_dir, upload_dir }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "PG_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_parse(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "pdfqa"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_parse(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── LLM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini", "openai", "ollama"
    pub provider: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Optional file overriding the built-in answer prompt.
    pub prompt_template_path: Option<PathBuf>,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "gemini").to_lowercase(),
            google_api_key: profiled_env_opt(p, "GOOGLE_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-1.5-flash"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.3),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 2048),
            prompt_template_path: profiled_env_opt(p, "PROMPT_TEMPLATE_PATH").map(PathBuf::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "gemini" | "google" => self.google_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }

    /// Model name for the active provider.
    pub fn model_name<'a>(&'a self, ollama: &'a OllamaConfig) -> &'a str {
        match self.provider.as_str() {
            "openai" => &self.openai_model,
            "ollama" => &ollama.model,
            _ => &self.gemini_model,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
            embedding_model: profiled_env_or(p, "OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── Text embedding ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "gemini", "openai", "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    /// LRU entries kept in front of the provider; 0 disables the cache.
    pub cache_size: usize,
}

impl EmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "EMBEDDING_PROVIDER", "gemini").to_lowercase(),
            model: profiled_env_or(p, "EMBEDDING_MODEL", "models/embedding-001"),
            dimensions: profiled_env_parse(p, "EMBEDDING_DIMENSIONS", 768),
            batch_size: profiled_env_parse(p, "EMBEDDING_BATCH_SIZE", 64),
            cache_size: profiled_env_parse(p, "EMBEDDING_CACHE_SIZE", 1024),
        }
    }
}

// ── Image embedding (CLIP) ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEmbeddingConfig {
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub dimensions: usize,
}

impl ImageEmbeddingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            enabled: profiled_env_bool(p, "IMAGE_EMBEDDINGS", false),
            url: profiled_env_or(p, "CLIP_URL", "http://localhost:8001"),
            model: profiled_env_or(p, "CLIP_MODEL", "openai/clip-vit-base-patch32"),
            dimensions: profiled_env_parse(p, "IMAGE_EMBEDDING_DIMENSIONS", 512),
        }
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of the same page.
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            chunk_size: profiled_env_parse(p, "CHUNK_SIZE", 1000),
            chunk_overlap: profiled_env_parse(p, "CHUNK_OVERLAP", 200),
        }
    }
}

// ── Retrieval ─────────────────────────────────────────────────

/// Whether queries search every uploaded document or only the one named in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    Shared,
    PerDocument,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "shared" => Ok(StoreMode::Shared),
            "per_document" | "document" => Ok(StoreMode::PerDocument),
            other => Err(format!("unknown store mode: '{other}'")),
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Shared => f.write_str("shared"),
            StoreMode::PerDocument => f.write_str("per_document"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub store_mode: StoreMode,
}

impl RetrievalConfig {
    fn from_env_profiled(p: &str) -> Self {
        let store_mode = match profiled_env_opt(p, "STORE_MODE") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{e}, falling back to shared");
                StoreMode::Shared
            }),
            None => StoreMode::Shared,
        };
        Self {
            top_k: profiled_env_parse(p, "RETRIEVAL_TOP_K", 3),
            store_mode,
        }
    }
}
