//! PDF ingestion and retrieval-augmented answering.
//!
//! Ingest: extract → chunk → embed (text, plus page images when enabled) →
//! save the upload → store. Ask: embed query → nearest chunks → LLM answer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pdfqa_core::{Config, StoreMode};
use pdfqa_ingest::document::chunker::{chunk_document, Chunk, ChunkConfig, ChunkConfigError};
use pdfqa_ingest::document::{decode_base64_image, extract_text, ExtractedDocument, ExtractionError};
use pdfqa_ingest::embedding::{
    combine_embeddings, pad_query_embedding, Embedder, EmbeddingBatcher, EmbeddingError, ImageEmbedder,
};
use pdfqa_llm::{AnswerError, AnswerGenerator, ContextPassage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::vector_store::{
    ChunkInsert, DocumentRecord, NewDocument, SearchResult, SearchScope, StoreError, VectorStore,
};

/// Upper bound on `k` for a single retrieval.
pub const MAX_TOP_K: usize = 50;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("Document '{0}' contains no extractable text")]
    NoText(String),
    #[error("Document '{0}' produced no chunks")]
    NoChunks(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction task failed: {0}")]
    Task(String),
    #[error("query is empty")]
    EmptyQuery,
    #[error("document_id is required when STORE_MODE=per_document")]
    DocumentRequired,
    #[error("document {0} not found")]
    DocumentNotFound(Uuid),
    #[error("no LLM provider configured")]
    LlmUnavailable,
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("invalid chunking config: {0}")]
    Chunking(#[from] ChunkConfigError),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunking: ChunkConfig,
    pub batch_size: usize,
    pub top_k: usize,
    pub store_mode: StoreMode,
    pub upload_dir: PathBuf,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            chunking: ChunkConfig::try_from(&config.chunking)?,
            batch_size: config.embedding.batch_size,
            top_k: config.retrieval.top_k,
            store_mode: config.retrieval.store_mode,
            upload_dir: config.storage.upload_dir.clone(),
        })
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub filename: String,
    pub stored_path: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub image_count: usize,
    pub embedding_dimensions: usize,
}

/// A retrieved passage as returned alongside an answer.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SourceDocument {
    pub page: i32,
    pub content: String,
    /// Filename of the PDF the passage came from.
    pub source: String,
    #[schema(value_type = String)]
    pub document_id: Uuid,
    pub similarity: f64,
}

impl From<SearchResult> for SourceDocument {
    fn from(r: SearchResult) -> Self {
        Self {
            page: r.page_number,
            content: r.content,
            source: r.filename,
            document_id: r.document_id,
            similarity: r.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct QueryAnswer {
    pub answer: String,
    pub documents: Vec<SourceDocument>,
}

pub struct RagPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    image_embedder: Option<Arc<dyn ImageEmbedder>>,
    answerer: Option<AnswerGenerator>,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, options: PipelineOptions) -> Self {
        Self {
            store,
            embedder,
            image_embedder: None,
            answerer: None,
            options,
        }
    }

    pub fn with_image_embedder(mut self, image_embedder: Arc<dyn ImageEmbedder>) -> Self {
        self.image_embedder = Some(image_embedder);
        self
    }

    pub fn with_answerer(mut self, answerer: AnswerGenerator) -> Self {
        self.answerer = Some(answerer);
        self
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn store_mode(&self) -> StoreMode {
        self.options.store_mode
    }

    /// Model answering questions, `None` when no LLM is configured.
    pub fn answer_model(&self) -> Option<&str> {
        self.answerer.as_ref().map(|a| a.model())
    }

    pub fn image_embeddings_enabled(&self) -> bool {
        self.image_embedder.is_some()
    }

    /// Length of every stored vector: text dimensions, plus image dimensions
    /// when image embeddings are enabled.
    pub fn embedding_dimensions(&self) -> usize {
        self.embedder.dimensions() + self.image_embedder.as_ref().map_or(0, |i| i.dimensions())
    }

    // ── Ingest ─────────────────────────────────────────

    /// Extract, chunk, embed, and store an uploaded PDF.
    pub async fn ingest(&self, bytes: Vec<u8>, filename: &str) -> Result<IngestReport, PipelineError> {
        let upload_name = display_name(filename).to_string();
        let safe_name = sanitize_filename(filename);
        let file_size = bytes.len();

        let extract_as = safe_name.clone();
        let (bytes, extracted) = tokio::task::spawn_blocking(move || {
            let result = extract_text(&bytes, &extract_as);
            (bytes, result)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?;
        let doc = extracted?;

        let total_chars = doc.total_chars();
        info!(
            "Extracted '{}': {} pages, {} chars, {} images",
            upload_name,
            doc.pages.len(),
            total_chars,
            doc.image_count()
        );
        if total_chars == 0 {
            return Err(PipelineError::NoText(upload_name));
        }

        let chunks = chunk_document(&doc, &self.options.chunking);
        if chunks.is_empty() {
            return Err(PipelineError::NoChunks(upload_name));
        }
        info!("Split '{}' into {} chunks", upload_name, chunks.len());

        let embeddings = self.embed_chunks(&doc, &chunks).await?;
        let embedding_dimensions = embeddings.first().map_or(0, Vec::len);

        let stored_path = self.save_upload(&safe_name, &bytes).await?;

        let inserts: Vec<ChunkInsert> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkInsert {
                chunk_index: chunk.index,
                content: chunk.content.clone(),
                page_number: chunk.page_number,
                image_count: chunk.image_count,
                embedding,
            })
            .collect();
        let chunk_count = inserts.len();

        let new_doc = NewDocument {
            filename: upload_name.clone(),
            stored_path: stored_path.to_string_lossy().into_owned(),
            file_size: file_size as i64,
            page_count: doc.pages.len() as i32,
        };

        let document_id = match self.persist(new_doc, inserts).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                    warn!("Failed to remove {} after store error: {rm}", stored_path.display());
                }
                return Err(e.into());
            }
        };

        info!("Stored '{}' as {} ({} chunks)", upload_name, document_id, chunk_count);

        Ok(IngestReport {
            document_id,
            filename: upload_name,
            stored_path: stored_path.to_string_lossy().into_owned(),
            page_count: doc.pages.len(),
            chunk_count,
            image_count: doc.image_count(),
            embedding_dimensions,
        })
    }

    async fn embed_chunks(&self, doc: &ExtractedDocument, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut batcher = EmbeddingBatcher::new(Arc::clone(&self.embedder), self.options.batch_size);
        let items: Vec<(usize, String)> = chunks.iter().map(|c| (c.index, c.content.clone())).collect();
        let text_vectors = batcher.embed_all(items).await?;

        let Some(image_embedder) = &self.image_embedder else {
            return Ok(text_vectors.into_iter().map(|(_, v)| v).collect());
        };

        let page_vectors = embed_page_images(image_embedder.as_ref(), doc).await;
        let image_dims = image_embedder.dimensions();
        Ok(chunks
            .iter()
            .zip(text_vectors)
            .map(|(chunk, (_, text))| {
                let images = page_vectors.get(&chunk.page_number).map_or(&[][..], Vec::as_slice);
                combine_embeddings(&text, images, image_dims)
            })
            .collect())
    }

    async fn save_upload(&self, safe_name: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
        tokio::fs::create_dir_all(&self.options.upload_dir).await?;
        let path = self.options.upload_dir.join(format!("{}_{}", Uuid::new_v4(), safe_name));
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved upload to {}", path.display());
        Ok(path)
    }

    /// Insert the document and its chunks, removing the document again if
    /// the chunks cannot be stored.
    async fn persist(&self, doc: NewDocument, chunks: Vec<ChunkInsert>) -> Result<Uuid, StoreError> {
        let id = self.store.insert_document(doc).await?;
        if let Err(e) = self.store.insert_chunks(id, chunks).await {
            if let Err(cleanup) = self.store.delete_document(id).await {
                warn!("Failed to roll back document {id}: {cleanup}");
            }
            return Err(e);
        }
        Ok(id)
    }

    // ── Retrieval ──────────────────────────────────────

    /// Map an optional document id onto a search scope for the configured
    /// store mode. A named document must exist.
    pub async fn resolve_scope(&self, document_id: Option<Uuid>) -> Result<SearchScope, PipelineError> {
        match (document_id, self.options.store_mode) {
            (Some(id), _) => {
                if self.store.get_document(id).await?.is_none() {
                    return Err(PipelineError::DocumentNotFound(id));
                }
                Ok(SearchScope::Document(id))
            }
            (None, StoreMode::Shared) => Ok(SearchScope::All),
            (None, StoreMode::PerDocument) => Err(PipelineError::DocumentRequired),
        }
    }

    /// Nearest chunks to `query`, best first. `k` defaults to the configured top-k.
    pub async fn retrieve(
        &self,
        query: &str,
        k: Option<usize>,
        scope: SearchScope,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        let k = k.unwrap_or(self.options.top_k).clamp(1, MAX_TOP_K);

        let mut vector = self.embedder.embed_query(query).await?;
        if let Some(image_embedder) = &self.image_embedder {
            vector = pad_query_embedding(vector, image_embedder.dimensions());
        }

        let results = self.store.search(&vector, k, scope).await?;
        debug!("Retrieved {} chunks for query ({:?})", results.len(), scope);
        Ok(results)
    }

    /// Retrieve context for `query` and have the LLM answer from it.
    pub async fn ask(&self, query: &str, k: Option<usize>, scope: SearchScope) -> Result<QueryAnswer, PipelineError> {
        let answerer = self.answerer.as_ref().ok_or(PipelineError::LlmUnavailable)?;
        let results = self.retrieve(query, k, scope).await?;

        let passages: Vec<ContextPassage> = results
            .iter()
            .map(|r| ContextPassage {
                content: r.content.clone(),
                page: usize::try_from(r.page_number).ok(),
            })
            .collect();
        let answer = answerer.answer(query, &passages).await?;

        Ok(QueryAnswer {
            answer,
            documents: results.into_iter().map(SourceDocument::from).collect(),
        })
    }

    // ── Documents ──────────────────────────────────────

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, PipelineError> {
        Ok(self.store.list_documents().await?)
    }

    /// Delete a document, its chunks, and its stored upload. `false` if unknown.
    pub async fn delete(&self, id: Uuid) -> Result<bool, PipelineError> {
        let Some(doc) = self.store.get_document(id).await? else {
            return Ok(false);
        };
        let deleted = self.store.delete_document(id).await?;
        if deleted {
            match tokio::fs::remove_file(&doc.stored_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {e}", doc.stored_path),
            }
            info!("Deleted document {} ({})", id, doc.filename);
        }
        Ok(deleted)
    }
}

/// CLIP vectors for every page that has images, keyed by page number.
/// Undecodable images and embedding failures only cost that page its
/// image signal.
async fn embed_page_images(embedder: &dyn ImageEmbedder, doc: &ExtractedDocument) -> HashMap<usize, Vec<Vec<f32>>> {
    let mut out = HashMap::new();
    for page in doc.pages.iter().filter(|p| !p.images.is_empty()) {
        let images: Vec<_> = page
            .images
            .iter()
            .filter_map(|b64| match decode_base64_image(b64) {
                Ok(img) => Some(img),
                Err(e) => {
                    warn!("page {}: skipping undecodable image: {e}", page.page_number);
                    None
                }
            })
            .collect();
        if images.is_empty() {
            continue;
        }
        match embedder.embed_images(&images).await {
            Ok(vectors) => {
                out.insert(page.page_number, vectors);
            }
            Err(e) => warn!("page {}: image embedding failed: {e}", page.page_number),
        }
    }
    out
}

/// Filename without any directory part, as shown to users.
pub fn display_name(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() {
        "upload.pdf"
    } else {
        base
    }
}

/// Filesystem-safe version of an uploaded filename.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = display_name(name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(128)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_directories() {
        assert_eq!(display_name("reports/2024/q1.pdf"), "q1.pdf");
        assert_eq!(display_name(r"C:\Users\me\notes.pdf"), "notes.pdf");
        assert_eq!(display_name("dir/"), "upload.pdf");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("annual report (final).pdf"), "annual_report__final_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..pdf"), "pdf");
        assert_eq!(sanitize_filename(""), "upload.pdf");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = format!("{}.pdf", "a".repeat(300));
        assert_eq!(sanitize_filename(&long).len(), 128);
    }

    #[test]
    fn source_document_from_search_result() {
        let id = Uuid::new_v4();
        let doc = SourceDocument::from(SearchResult {
            chunk_id: Uuid::nil(),
            document_id: id,
            filename: "a.pdf".into(),
            content: "text".into(),
            chunk_index: 0,
            page_number: 7,
            image_count: 1,
            similarity: 0.5,
        });
        assert_eq!(doc.page, 7);
        assert_eq!(doc.source, "a.pdf");
        assert_eq!(doc.document_id, id);
    }
}
