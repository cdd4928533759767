pub mod batcher;
pub mod cache;
pub mod clip;
pub mod combine;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use batcher::EmbeddingBatcher;
pub use cache::{CachedEmbedder, EmbeddingCache};
pub use clip::{ClipEmbedder, ImageEmbedder};
pub use combine::{combine_embeddings, l2_normalize, mean_vector, pad_query_embedding};
pub use gemini::GeminiEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};
