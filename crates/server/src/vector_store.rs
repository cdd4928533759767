//! Chunk storage and similarity search.
//!
//! `PgVectorStore` persists to PostgreSQL with pgvector; `MemoryVectorStore`
//! keeps everything in process and is used when no database is configured.

mod memory;
mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryVectorStore;
pub use pg::PgVectorStore;

// ── Types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    /// Where the uploaded PDF is kept on disk.
    pub stored_path: String,
    pub file_size: i64,
    pub page_count: i32,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_count: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SearchResult {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub filename: String,
    pub content: String,
    pub chunk_index: i32,
    pub page_number: i32,
    pub image_count: i32,
    /// Cosine similarity, 1.0 = identical direction.
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub stored_path: String,
    pub file_size: i64,
    pub page_count: i32,
}

#[derive(Debug, Clone)]
pub struct ChunkInsert {
    pub chunk_index: usize,
    pub content: String,
    pub page_number: usize,
    pub image_count: usize,
    pub embedding: Vec<f32>,
}

/// Which chunks a search may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Every stored document (shared store).
    All,
    /// A single document's chunks (per-document store).
    Document(Uuid),
}

impl SearchScope {
    pub fn document_id(self) -> Option<Uuid> {
        match self {
            SearchScope::All => None,
            SearchScope::Document(id) => Some(id),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document {0} not found")]
    DocumentNotFound(Uuid),
}

// ── Trait ──────────────────────────────────────────

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for health output and logs.
    fn backend(&self) -> &'static str;

    /// Insert a new document record and return its id.
    async fn insert_document(&self, doc: NewDocument) -> Result<Uuid, StoreError>;

    /// Insert chunks with embeddings for a document. Returns how many were stored.
    async fn insert_chunks(&self, document_id: Uuid, chunks: Vec<ChunkInsert>) -> Result<usize, StoreError>;

    /// The `k` chunks most similar to `embedding`, best first.
    async fn search(&self, embedding: &[f32], k: usize, scope: SearchScope) -> Result<Vec<SearchResult>, StoreError>;

    /// All documents with chunk counts, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError>;

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError>;

    /// Delete a document and all its chunks. `false` if it did not exist.
    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError>;
}
