use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::{ChunkInsert, DocumentRecord, NewDocument, SearchResult, SearchScope, StoreError, VectorStore};

/// pgvector-backed store. Chunks cascade-delete with their document.
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DOCUMENT_COLUMNS: &str = "SELECT d.id, d.filename, d.stored_path, d.file_size, d.page_count, d.uploaded_at, \
     COUNT(c.id) AS chunk_count \
     FROM documents d \
     LEFT JOIN chunks c ON c.document_id = d.id";

fn document_from_row(row: &PgRow) -> DocumentRecord {
    DocumentRecord {
        id: row.get("id"),
        filename: row.get("filename"),
        stored_path: row.get("stored_path"),
        file_size: row.get("file_size"),
        page_count: row.get("page_count"),
        uploaded_at: row.get("uploaded_at"),
        chunk_count: row.get("chunk_count"),
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_document(&self, doc: NewDocument) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO documents (id, filename, stored_path, file_size, page_count) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&doc.filename)
        .bind(&doc.stored_path)
        .bind(doc.file_size)
        .bind(doc.page_count)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_chunks(&self, document_id: Uuid, chunks: Vec<ChunkInsert>) -> Result<usize, StoreError> {
        let count = chunks.len();
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            let embedding = Vector::from(chunk.embedding);
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, content, page_number, image_count, embedding) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(chunk.chunk_index as i32)
            .bind(&chunk.content)
            .bind(chunk.page_number as i32)
            .bind(chunk.image_count as i32)
            .bind(&embedding)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!("stored {count} chunks for document {document_id}");
        Ok(count)
    }

    async fn search(&self, embedding: &[f32], k: usize, scope: SearchScope) -> Result<Vec<SearchResult>, StoreError> {
        let embedding = Vector::from(embedding.to_vec());
        let rows = sqlx::query(
            "SELECT c.id, c.document_id, d.filename, c.content, c.chunk_index, \
             c.page_number, c.image_count, \
             1.0 - (c.embedding <=> $1::vector) AS similarity \
             FROM chunks c \
             JOIN documents d ON d.id = c.document_id \
             WHERE ($3::uuid IS NULL OR c.document_id = $3) \
             ORDER BY c.embedding <=> $1::vector \
             LIMIT $2",
        )
        .bind(&embedding)
        .bind(k as i64)
        .bind(scope.document_id())
        .fetch_all(&self.pool)
        .await?;

        let results = rows
            .iter()
            .map(|row| SearchResult {
                chunk_id: row.get("id"),
                document_id: row.get("document_id"),
                filename: row.get("filename"),
                content: row.get("content"),
                chunk_index: row.get("chunk_index"),
                page_number: row.get("page_number"),
                image_count: row.get("image_count"),
                similarity: row.get("similarity"),
            })
            .collect();
        Ok(results)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let rows = sqlx::query(&format!("{DOCUMENT_COLUMNS} GROUP BY d.id ORDER BY d.uploaded_at DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        let row = sqlx::query(&format!("{DOCUMENT_COLUMNS} WHERE d.id = $1 GROUP BY d.id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
