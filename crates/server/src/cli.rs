//! Command-line interface for the `pdfqa` binary.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pdfqa_core::Config;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::{QueryAnswer, RagPipeline};
use crate::startup;

/// Question answering over PDFs.
///
/// Upload PDFs over HTTP with `serve`, or ingest and ask from the terminal.
#[derive(Parser, Debug)]
#[command(name = "pdfqa", version, about = "Question answering over PDFs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Extract, chunk, embed, and store a PDF
    Ingest {
        /// Path to the PDF
        file: PathBuf,
    },
    /// Answer a question from the stored documents
    Ask {
        /// The question. Read from stdin when omitted.
        question: Option<String>,
        /// Ingest this PDF before asking
        #[arg(long)]
        file: Option<PathBuf>,
        /// Restrict retrieval to one document
        #[arg(long)]
        document: Option<Uuid>,
        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        k: Option<usize>,
    },
    /// Print the effective configuration with secrets redacted
    Config,
}

/// Run the parsed command to completion.
pub async fn dispatch(config: &Config, cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => startup::serve(config).await,
        Command::Ingest { file } => {
            let pipeline = startup::build_pipeline(config).await?;
            ingest_file(&pipeline, &file).await?;
            Ok(())
        }
        Command::Ask {
            question,
            file,
            document,
            k,
        } => {
            let pipeline = startup::build_pipeline(config).await?;
            let mut document = document;
            if let Some(path) = file {
                let id = ingest_file(&pipeline, &path).await?;
                document.get_or_insert(id);
            } else if pipeline.store_backend() == "memory" {
                info!("In-memory store is empty at startup; pass --file to ingest a PDF first");
            }

            let question = match question {
                Some(q) => q,
                None => prompt_question()?,
            };
            let scope = pipeline.resolve_scope(document).await?;
            let answer = pipeline.ask(&question, k, scope).await?;
            print!("{}", format_answer(&answer));
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
            Ok(())
        }
    }
}

async fn ingest_file(pipeline: &RagPipeline, path: &Path) -> anyhow::Result<Uuid> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf");
    let report = pipeline.ingest(bytes, filename).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.document_id)
}

fn prompt_question() -> anyhow::Result<String> {
    print!("Enter your query: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("no question given");
    }
    Ok(line)
}

/// Terminal rendering of an answer: each source passage with a short
/// preview, then the answer.
pub fn format_answer(answer: &QueryAnswer) -> String {
    let mut out = String::from("\nRelevant Documents:\n");
    for (i, doc) in answer.documents.iter().enumerate() {
        let preview: String = doc.content.chars().take(200).collect();
        out.push_str(&format!("\nDocument {}:\n", i + 1));
        out.push_str(&format!("Source: {}\n", doc.source));
        out.push_str(&format!("Page: {}\n", doc.page));
        out.push_str(&format!("Preview: {preview}...\n"));
    }
    out.push_str(&format!("\nAnswer: {}\n", answer.answer));
    out
}
