use std::path::Path;

use pdfqa_core::config::{LlmConfig, OllamaConfig};
use tracing::{debug, info};

use crate::provider::{LlmError, LlmProvider, Message};

/// Built-in answer prompt. A file set via `PROMPT_TEMPLATE_PATH` replaces it.
const DEFAULT_TEMPLATE: &str = include_str!("../prompts/answer.md");

/// Replaced with the retrieved passages, separated by blank lines.
const CONTEXT_PLACEHOLDER: &str = "<<<context>>>";

/// Replaced with the user's question.
const QUESTION_PLACEHOLDER: &str = "<<<question>>>";

/// A retrieved passage handed to the model as context.
#[derive(Debug, Clone)]
pub struct ContextPassage {
    pub content: String,
    /// 1-based page the passage came from, when known.
    pub page: Option<usize>,
}

impl ContextPassage {
    /// Passage text as it appears in the prompt, tagged with its page.
    fn render(&self) -> String {
        match self.page {
            Some(page) => format!("[Page {page}]\n{}", self.content),
            None => self.content.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("invalid prompt template: {0}")]
    Template(String),
}

/// Answers a question from retrieved passages by "stuffing" them all into a
/// single prompt.
pub struct AnswerGenerator {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    template: String,
}

impl AnswerGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Replace the prompt template. It must contain each placeholder exactly once.
    pub fn with_template(mut self, template: String) -> Result<Self, AnswerError> {
        validate_template(&template)?;
        self.template = template;
        Ok(self)
    }

    /// Build from config, creating the appropriate provider and loading the
    /// template override if one is configured.
    pub fn from_config(llm_config: &LlmConfig, ollama_config: &OllamaConfig) -> Result<Self, AnswerError> {
        let provider = crate::providers::create_provider(llm_config, ollama_config)?;
        let generator = Self::new(provider, llm_config.temperature, llm_config.max_tokens);
        match &llm_config.prompt_template_path {
            Some(path) => generator.with_template(load_template(path)?),
            None => Ok(generator),
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Answer `question` using only `passages` as context.
    pub async fn answer(&self, question: &str, passages: &[ContextPassage]) -> Result<String, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let context = passages.iter().map(ContextPassage::render).collect::<Vec<_>>().join("\n\n");
        let prompt = render_prompt(&self.template, &context, question);

        info!(
            "Answering with {} context passages ({} chars) via {}",
            passages.len(),
            context.chars().count(),
            self.provider.model()
        );

        let response = self
            .provider
            .complete(vec![Message::user(prompt)], self.temperature, self.max_tokens)
            .await?;

        debug!("LLM response: {}", response);
        Ok(response.trim().to_string())
    }
}

/// Load a prompt template from disk, failing eagerly with a clear message.
fn load_template(path: &Path) -> Result<String, AnswerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AnswerError::Template(format!("failed to read {}: {e}", path.display())))?;
    validate_template(&content).map_err(|e| AnswerError::Template(format!("{}: {e}", path.display())))?;
    Ok(content)
}

fn validate_template(template: &str) -> Result<(), AnswerError> {
    for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
        let count = template.matches(placeholder).count();
        if count != 1 {
            return Err(AnswerError::Template(format!(
                "must contain exactly one '{placeholder}' placeholder, found {count}"
            )));
        }
    }
    Ok(())
}

/// Substitute both placeholders in one pass so text inside the context can
/// never be mistaken for a placeholder.
fn render_prompt(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(pos) = rest.find("<<<") {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
            out.push_str(question);
            rest = after;
        } else {
            out.push_str("<<<");
            rest = &tail[3..];
        }
    }
    out.push_str(rest);
    out
}
