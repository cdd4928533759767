//! Page-aware chunking of extracted documents.

use super::helpers::split_text_into_chunks;
use super::types::{Chunk, ChunkConfig};
use crate::document::ExtractedDocument;

/// Chunk a document page by page. Chunks never cross a page boundary, so
/// every chunk keeps the page number it was cut from. Empty pages produce
/// nothing; indices are contiguous across the whole document.
pub fn chunk_document(doc: &ExtractedDocument, config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for page in &doc.pages {
        if page.content.trim().is_empty() {
            continue;
        }
        for content in split_text_into_chunks(&page.content, config) {
            chunks.push(Chunk {
                index: chunks.len(),
                content,
                page_number: page.page_number,
                image_count: page.images.len(),
            });
        }
    }

    chunks
}
