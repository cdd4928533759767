//! Fakes and fixtures shared by the pipeline and API tests.
//!
//! Nothing here touches the network: embeddings are hashed bags of words and
//! the LLM echoes a canned reply while recording the prompts it was sent.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::RgbImage;
use pdfqa_core::{Config, StoreMode};
pub use pdfqa_ingest::document::test_pdf::build_pdf as build_pdf_with_images;
use pdfqa_ingest::embedding::{Embedder, EmbeddingError, ImageEmbedder};
use pdfqa_llm::{AnswerGenerator, LlmError, LlmProvider, Message};
use pdfqa_server::pipeline::{PipelineOptions, RagPipeline};
use pdfqa_server::state::AppState;
use pdfqa_server::vector_store::MemoryVectorStore;

pub const TEXT_DIMS: usize = 256;
pub const IMAGE_DIMS: usize = 8;
pub const CANNED_ANSWER: &str = "Turbines turn wind into electricity.";

// ── Embedders ──────────────────────────────────────

/// Hashes lowercase words into buckets and L2-normalises the counts, so
/// texts that share words point in similar directions.
pub struct BagOfWordsEmbedder;

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; TEXT_DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
        v[(hash % TEXT_DIMS as u64) as usize] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v[0] = 1.0;
    } else {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn dimensions(&self) -> usize {
        TEXT_DIMS
    }
}

/// Every image maps to the same unit vector.
pub struct ConstantImageEmbedder;

#[async_trait]
impl ImageEmbedder for ConstantImageEmbedder {
    async fn embed_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut v = vec![0.0f32; IMAGE_DIMS];
        v[0] = 1.0;
        Ok(vec![v; images.len()])
    }

    fn dimensions(&self) -> usize {
        IMAGE_DIMS
    }
}

// ── LLM ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct StubLlm {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, messages: Vec<Message>, _temperature: f32, _max_tokens: u32) -> Result<String, LlmError> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(format!("  {CANNED_ANSWER}\n"))
    }

    fn model(&self) -> &str {
        "stub-llm"
    }
}

// ── Fixtures ───────────────────────────────────────

pub fn test_config(upload_dir: &Path, mode: StoreMode) -> Config {
    let mut config = Config::for_profile("PDFQA_TEST");
    config.storage.upload_dir = upload_dir.to_path_buf();
    config.server.max_upload_mb = 1;
    config.server.cors_origins = vec!["http://localhost:5173".to_string()];
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 20;
    config.embedding.batch_size = 2;
    config.embedding.dimensions = TEXT_DIMS;
    config.retrieval.top_k = 2;
    config.retrieval.store_mode = mode;
    config
}

pub struct Harness {
    pub config: Config,
    pub pipeline: RagPipeline,
    pub llm: StubLlm,
}

pub struct HarnessBuilder {
    mode: StoreMode,
    llm: bool,
    images: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            mode: StoreMode::Shared,
            llm: true,
            images: false,
        }
    }

    pub fn per_document(mut self) -> Self {
        self.mode = StoreMode::PerDocument;
        self
    }

    pub fn without_llm(mut self) -> Self {
        self.llm = false;
        self
    }

    pub fn with_images(mut self) -> Self {
        self.images = true;
        self
    }

    pub fn build(self, upload_dir: &Path) -> Harness {
        let config = test_config(upload_dir, self.mode);
        let options = PipelineOptions::from_config(&config).unwrap();
        let llm = StubLlm::default();

        let mut pipeline = RagPipeline::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(BagOfWordsEmbedder),
            options,
        );
        if self.images {
            pipeline = pipeline.with_image_embedder(Arc::new(ConstantImageEmbedder));
        }
        if self.llm {
            pipeline = pipeline.with_answerer(AnswerGenerator::new(Box::new(llm.clone()), 0.0, 256));
        }
        Harness { config, pipeline, llm }
    }
}

impl Harness {
    pub fn into_state(self) -> Arc<AppState> {
        Arc::new(AppState {
            config: self.config,
            pipeline: self.pipeline,
        })
    }
}

// ── PDFs ───────────────────────────────────────────

pub const ENERGY_PAGES: [&str; 3] = [
    "Solar panels convert sunlight into electricity on rooftops",
    "Wind turbines spin in strong coastal winds to make power",
    "Bread dough rises slowly when yeast ferments the sugar",
];

/// A PDF with one line of text per page.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let text_only: Vec<(&str, bool)> = pages.iter().map(|p| (*p, false)).collect();
    build_pdf_with_images(&text_only)
}
