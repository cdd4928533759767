//! PDF ingestion: page extraction, chunking, and text/image embedding backends.

pub mod document;
pub mod embedding;
