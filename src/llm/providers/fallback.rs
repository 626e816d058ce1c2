

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::base::{ChatMessage, ChatOptions, LlmMetadata, LlmProvider, LlmProviderError};
use super::ollama::OllamaProvider;


/// Routes chat calls to a local Ollama model when the primary provider fails.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<OllamaProvider>,
    fallback_model: String,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback_enabled: bool,
        fallback_url: &str,
        fallback_model: &str,
        temperature: f64,
    ) -> Self {
        info!(
            "LlmProviderWithFallback initialized: primary={}, fallback={}",
            primary.provider_name(),
            if fallback_enabled { format!("{}/{}", fallback_url, fallback_model) } else { "disabled".to_string() }
        );

        Self {
            primary,
            fallback: fallback_enabled.then(|| OllamaProvider::new(fallback_url, fallback_model, temperature)),
            fallback_model: fallback_model.to_string(),
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let original_error = match self.primary.chat(messages, options).await {
            Ok(result) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                return Ok(result);
            }
            Err(e) => e,
        };

        let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Primary LLM provider failed ({}x): {}", failures, original_error);

        let Some(fallback) = &self.fallback else {
            return Err(original_error);
        };

        // The primary's model name means nothing to Ollama.
        let fallback_options = ChatOptions {
            model: None,
            ..options.clone()
        };
        let (content, mut metadata) = fallback.chat(messages, &fallback_options).await?;

        metadata.fallback_used = true;
        metadata.original_provider = Some(self.primary.provider_name().to_string());
        metadata.original_error = Some(original_error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        let total = self.fallback_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Fallback successful, total_fallbacks={}", total);

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            "ollama (fallback)"
        } else {
            self.primary.provider_name()
        }
    }

    fn model_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            &self.fallback_model
        } else {
            self.primary.model_name()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    #[async_trait]
    impl LlmProvider for Unreachable {
        async fn chat(&self, _: &[ChatMessage], _: &ChatOptions) -> Result<(String, LlmMetadata), LlmProviderError> {
            Err(LlmProviderError::Provider("503 from upstream".to_string()))
        }

        fn provider_name(&self) -> &str {
            "unreachable"
        }

        fn model_name(&self) -> &str {
            "none"
        }
    }

    #[tokio::test]
    async fn test_disabled_fallback_returns_primary_error() {
        let provider = LlmProviderWithFallback::new(Arc::new(Unreachable), false, "http://localhost:11434", "llama3.2", 0.3);

        let err = provider.generate("sys", "user", None).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(provider.primary_failures(), 1);
        assert_eq!(provider.fallback_count(), 0);
        assert_eq!(provider.provider_name(), "unreachable");
    }
}
