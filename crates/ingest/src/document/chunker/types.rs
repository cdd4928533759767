//! Chunk configuration and output types.

use thiserror::Error;

// ── Configuration ───────────────────────────────────────────────────────────

/// Separators tried in order when a piece is still too long.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("chunk_size must be greater than 0")]
    ZeroSize,
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Configuration for the chunking engine. Lengths are in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk (default: 1000).
    pub chunk_size: usize,
    /// Characters carried over between adjacent chunks (default: 200).
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_size == 0 {
            return Err(ChunkConfigError::ZeroSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl TryFrom<&pdfqa_core::config::ChunkingConfig> for ChunkConfig {
    type Error = ChunkConfigError;

    fn try_from(cfg: &pdfqa_core::config::ChunkingConfig) -> Result<Self, Self::Error> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap)
    }
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A chunk of page text with metadata for attribution.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// The chunk text content.
    pub content: String,
    /// 1-based page the chunk was cut from.
    pub page_number: usize,
    /// Number of images on that page.
    pub image_count: usize,
}
