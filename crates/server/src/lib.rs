//! PDF question-answering server: vector store, ingestion and retrieval
//! pipeline, HTTP API, and CLI.

pub mod api;
pub mod app_config;
pub mod cli;
pub mod db;
pub mod pipeline;
pub mod router;
pub mod startup;
pub mod state;
pub mod vector_store;
