use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use cloudsketch_core::settings::{ai_configured, AiSettings};

use crate::error::{LlmError, Result};

/// Anything that turns a system + user prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String>;
}

fn map_backend(provider: &str) -> Result<LLMBackend> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" | "gemini" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

/// [`TextGenerator`] backed by the `llm` crate.
pub struct LlmEngine {
    settings: AiSettings,
}

impl LlmEngine {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }
}

#[async_trait]
impl TextGenerator for LlmEngine {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String> {
        let settings = &self.settings;
        if !ai_configured(settings) {
            return Err(LlmError::NotConfigured);
        }
        let backend = map_backend(&settings.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&settings.model)
            .system(system)
            .temperature(settings.temperature)
            .max_tokens(settings.max_tokens);

        if !settings.api_key.is_empty() {
            builder = builder.api_key(&settings.api_key);
        }

        let llm = builder.build().map_err(|e| LlmError::Build(e.to_string()))?;

        let messages = vec![ChatMessage::user().content(user_msg).build()];

        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| LlmError::Chat(e.to_string()))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_is_an_alias_for_google() {
        assert!(matches!(map_backend("gemini"), Ok(LLMBackend::Google)));
        assert!(matches!(
            map_backend("watsonx"),
            Err(LlmError::UnknownProvider(p)) if p == "watsonx"
        ));
    }

    #[tokio::test]
    async fn unconfigured_engine_fails_fast() {
        let engine = LlmEngine::new(AiSettings::default());
        let err = engine.generate("sys", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }
}
