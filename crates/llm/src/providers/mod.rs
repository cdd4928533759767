pub mod gemini;
pub mod ollama;
pub mod openai;

use pdfqa_core::config::{LlmConfig, OllamaConfig};
use tracing::info;

use crate::provider::{LlmError, LlmProvider};

/// Create the appropriate LLM provider based on config.
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    let provider: Box<dyn LlmProvider> = match llm_config.provider.as_str() {
        "gemini" | "google" => {
            let api_key = llm_config
                .google_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GOOGLE_API_KEY not set".into()))?;
            Box::new(gemini::GeminiProvider::new(
                api_key.clone(),
                llm_config.gemini_model.clone(),
            ))
        }
        "openai" => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = llm_config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Box::new(openai::OpenAiProvider::new(
                api_key.clone(),
                llm_config.openai_model.clone(),
                base_url.to_string(),
            ))
        }
        "ollama" => Box::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            ollama_config.model.clone(),
        )),
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown LLM provider: '{other}'"
            )))
        }
    };
    info!("LLM provider: {} ({})", llm_config.provider, provider.model());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            google_api_key: None,
            gemini_model: "gemini-1.5-flash".into(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: None,
            temperature: 0.3,
            max_tokens: 2048,
            prompt_template_path: None,
        }
    }

    fn ollama() -> OllamaConfig {
        OllamaConfig {
            url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            embedding_model: "nomic-embed-text".into(),
        }
    }

    #[test]
    fn gemini_requires_key() {
        let err = create_provider(&llm("gemini"), &ollama()).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(ref m) if m.contains("GOOGLE_API_KEY")));
    }

    #[test]
    fn gemini_with_key_uses_configured_model() {
        let mut cfg = llm("gemini");
        cfg.google_api_key = Some("k".into());
        let provider = create_provider(&cfg, &ollama()).unwrap();
        assert_eq!(provider.model(), "gemini-1.5-flash");
    }

    #[test]
    fn ollama_needs_no_key() {
        let provider = create_provider(&llm("ollama"), &ollama()).unwrap();
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn unknown_provider_rejected() {
        assert!(create_provider(&llm("mystery"), &ollama()).is_err());
    }
}
