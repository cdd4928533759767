//! Server startup: shared state initialization and the HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use pdfqa_core::Config;
use tracing::info;

use crate::app_config;
use crate::pipeline::{PipelineOptions, RagPipeline};
use crate::router::build_router;
use crate::state::AppState;

/// Build the RAG pipeline from config. Fails when no text embedder can be built.
pub async fn build_pipeline(config: &Config) -> anyhow::Result<RagPipeline> {
    config.validate()?;

    let store = app_config::build_store(config).await;
    info!("Vector store: {} (mode: {})", store.backend(), config.retrieval.store_mode);

    let embedder = app_config::build_embedder(config).context("embedding provider unavailable")?;
    let options = PipelineOptions::from_config(config)?;
    let mut pipeline = RagPipeline::new(store, embedder, options);

    if let Some(image_embedder) = app_config::build_image_embedder(config) {
        pipeline = pipeline.with_image_embedder(image_embedder);
    }
    if let Some(answerer) = app_config::build_answer_generator(config) {
        pipeline = pipeline.with_answerer(answerer);
    }
    Ok(pipeline)
}

pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let pipeline = build_pipeline(config).await?;
    Ok(Arc::new(AppState {
        config: config.clone(),
        pipeline,
    }))
}

/// Start the HTTP server and block until it exits.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = build_app_state(config).await?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://localhost:{}", config.server.port);
    axum::serve(listener, app).await?;

    Ok(())
}
