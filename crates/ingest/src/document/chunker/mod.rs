//! Recursive character chunking.
//!
//! Splits each extracted page into overlapping chunks suitable for embedding.
//! Separators are tried coarse to fine (paragraph, line, word, character) and
//! chunks never span a page boundary.

mod helpers;
mod strategies;
mod types;

pub use helpers::split_text_into_chunks;
pub use strategies::chunk_document;
pub use types::{Chunk, ChunkConfig, ChunkConfigError};
