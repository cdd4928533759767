use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChunkInsert, DocumentRecord, NewDocument, SearchResult, SearchScope, StoreError, VectorStore};

struct StoredDocument {
    doc: NewDocument,
    uploaded_at: DateTime<Utc>,
}

struct StoredChunk {
    id: Uuid,
    document_id: Uuid,
    chunk: ChunkInsert,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, StoredDocument>,
    chunks: Vec<StoredChunk>,
}

/// In-process store with brute-force cosine search. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn record(&self, id: Uuid, stored: &StoredDocument) -> DocumentRecord {
        let chunk_count = self.chunks.iter().filter(|c| c.document_id == id).count();
        DocumentRecord {
            id,
            filename: stored.doc.filename.clone(),
            stored_path: stored.doc.stored_path.clone(),
            file_size: stored.doc.file_size,
            page_count: stored.doc.page_count,
            uploaded_at: stored.uploaded_at,
            chunk_count: chunk_count as i64,
        }
    }
}

/// Cosine similarity; 0.0 when either vector is zero or the lengths differ.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_document(&self, doc: NewDocument) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.inner.write().await.documents.insert(
            id,
            StoredDocument {
                doc,
                uploaded_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn insert_chunks(&self, document_id: Uuid, chunks: Vec<ChunkInsert>) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.documents.contains_key(&document_id) {
            return Err(StoreError::DocumentNotFound(document_id));
        }
        let count = chunks.len();
        inner.chunks.extend(chunks.into_iter().map(|chunk| StoredChunk {
            id: Uuid::new_v4(),
            document_id,
            chunk,
        }));
        Ok(count)
    }

    async fn search(&self, embedding: &[f32], k: usize, scope: SearchScope) -> Result<Vec<SearchResult>, StoreError> {
        let inner = self.inner.read().await;
        let mut scored: Vec<(f64, &StoredChunk)> = inner
            .chunks
            .iter()
            .filter(|c| scope.document_id().map_or(true, |id| c.document_id == id))
            .map(|c| (cosine_similarity(embedding, &c.chunk.embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(similarity, c)| SearchResult {
                chunk_id: c.id,
                document_id: c.document_id,
                filename: inner
                    .documents
                    .get(&c.document_id)
                    .map(|d| d.doc.filename.clone())
                    .unwrap_or_default(),
                content: c.chunk.content.clone(),
                chunk_index: c.chunk.chunk_index as i32,
                page_number: c.chunk.page_number as i32,
                image_count: c.chunk.image_count as i32,
                similarity,
            })
            .collect())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut docs: Vec<DocumentRecord> = inner.documents.iter().map(|(id, d)| inner.record(*id, d)).collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(docs)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(&id).map(|d| inner.record(id, d)))
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.documents.remove(&id).is_none() {
            return Ok(false);
        }
        inner.chunks.retain(|c| c.document_id != id);
        Ok(true)
    }
}
