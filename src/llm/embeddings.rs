

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::SynthConfig;
use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_OPENAI_URL};


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}


/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}


#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub fallback_enabled: bool,
    pub fallback_url: String,
    pub fallback_model: String,
}

impl EmbeddingSettings {
    pub fn from_config(config: &SynthConfig) -> Self {
        Self {
            provider: config.embedding_provider.to_lowercase(),
            url: config.embedding_url.clone(),
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
            timeout_secs: config.timeout,
            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL,
            fallback_enabled: config.embedding_fallback_enabled,
            fallback_url: config.embedding_fallback_url.clone(),
            fallback_model: config.embedding_fallback_model.clone(),
        }
    }
}


/// HTTP embedding client for Ollama or OpenAI-compatible endpoints, with a
/// TTL-bounded LRU cache and an Ollama fallback for non-Ollama primaries.
pub struct EmbeddingGenerator {
    settings: EmbeddingSettings,
    client: Client,
    cache: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
    fallback_count: AtomicUsize,
}

impl EmbeddingGenerator {

    pub fn new(settings: EmbeddingSettings) -> Self {
        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            settings.provider, settings.model, settings.cache_size
        );

        let capacity = NonZeroUsize::new(settings.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .build()
                .unwrap_or_default(),
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(settings.cache_ttl_secs),
            fallback_count: AtomicUsize::new(0),
            settings,
        }
    }


    pub async fn generate(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        if let Some(cached) = self.cached(text) {
            debug!("Embedding cache HIT for: {}", crate::preview(text, 50));
            return Ok(cached);
        }

        let result = match self.settings.provider.as_str() {
            "ollama" => self.generate_ollama(&self.settings.url, &self.settings.model, text).await,
            "openai" => self.generate_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        let embedding = match result {
            Ok(embedding) => embedding,
            Err(e) if self.settings.fallback_enabled && self.settings.provider != "ollama" => {
                debug!("Primary embedding provider unavailable, trying fallback: {}", e);
                let embedding = self
                    .generate_ollama(&self.settings.fallback_url, &self.settings.fallback_model, text)
                    .await
                    .map_err(|fallback_err| EmbeddingError::BothFailed(e.to_string(), fallback_err.to_string()))?;
                let total = self.fallback_count.fetch_add(1, Ordering::SeqCst) + 1;
                info!("Embedding fallback used, dims={}, total_fallbacks={}", embedding.len(), total);
                embedding
            }
            Err(e) => return Err(e),
        };

        self.cache.lock().put(text.to_string(), (embedding.clone(), Instant::now()));
        Ok(embedding)
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.lock();
        match cache.get(text) {
            Some((embedding, at)) if at.elapsed() < self.ttl => Some(embedding.clone()),
            Some(_) => {
                cache.pop(text);
                None
            }
            None => None,
        }
    }

    async fn generate_ollama(&self, url: &str, model: &str, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", url.trim_end_matches('/')))
            .json(&OllamaEmbeddingRequest { model, prompt: text })
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        if response.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding".to_string()));
        }
        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let api_url = if self.settings.url.starts_with("https://") || self.settings.url.ends_with("/v1") {
            self.settings.url.trim_end_matches('/').to_string()
        } else {
            DEFAULT_OPENAI_URL.to_string()
        };

        let response = self
            .client
            .post(format!("{}/embeddings", api_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&OpenAIEmbeddingRequest {
                model: &self.settings.model,
                input: text,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }


    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        let mut settings = EmbeddingSettings::from_config(&SynthConfig::default());
        settings.provider = provider.to_string();
        settings.cache_size = 2;
        settings
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let generator = EmbeddingGenerator::new(settings("ollama"));
        let err = generator.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyText));
    }

    #[tokio::test]
    async fn test_unknown_provider_without_fallback() {
        let mut settings = settings("cohere");
        settings.fallback_enabled = false;
        let generator = EmbeddingGenerator::new(settings);

        let err = generator.embed("sepsis").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotImplemented(ref p) if p == "cohere"));
        assert_eq!(generator.cache_size(), 0);
    }

    #[test]
    fn test_cache_is_bounded_and_expires() {
        let mut settings = settings("ollama");
        settings.cache_ttl_secs = 0;
        let generator = EmbeddingGenerator::new(settings);

        for text in ["a", "b", "c"] {
            generator.cache.lock().put(text.to_string(), (vec![1.0], Instant::now()));
        }
        assert_eq!(generator.cache_size(), 2);
        assert!(generator.cached("c").is_none());
        assert_eq!(generator.cache_size(), 1);
    }
}
