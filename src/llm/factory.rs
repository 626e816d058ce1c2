

use std::sync::Arc;

use super::embeddings::{EmbeddingGenerator, EmbeddingSettings};
use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::core::config::SynthConfig;
use crate::core::error::{Result, SynthError};
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Box<dyn LlmProvider>> {
        match provider.to_lowercase().as_str() {
            "openai" => Ok(Box::new(OpenAiProvider::new(
                api_key.unwrap_or_default(),
                base_url.map(String::from),
                model,
                temperature,
                timeout_secs,
            ))),
            "ollama" => Ok(Box::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
            ))),
            other => Err(SynthError::UnsupportedProvider(format!(
                "{}. Supported: openai, ollama",
                other
            ))),
        }
    }

    /// Configured completion provider, wrapped with the Ollama fallback.
    pub fn from_config(config: &SynthConfig) -> Result<Arc<dyn LlmProvider>> {
        let primary: Arc<dyn LlmProvider> = Arc::from(Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            config.timeout,
        )?);

        Ok(Arc::new(LlmProviderWithFallback::new(
            primary,
            config.llm_fallback_enabled,
            &config.llm_fallback_url,
            &config.llm_fallback_model,
            config.llm_temperature,
        )))
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    #[must_use]
    pub fn from_config(config: &SynthConfig) -> EmbeddingGenerator {
        EmbeddingGenerator::new(EmbeddingSettings::from_config(config))
    }
}
