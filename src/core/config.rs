

use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::Result;
use crate::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HELIX_PORT, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_PROMPTS_PATH, DEFAULT_SYNTHESIS_TEMPLATE,
};


/// Knobs of the retrieval core. Defaults reproduce the reference behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum hops walked out of each resolved entity (inclusive).
    pub max_depth: usize,
    /// Paths kept per resolved entity, after edge-type filtering.
    pub paths_per_entity: usize,
    /// Bookkeeping edge types that must never appear in a returned path.
    pub excluded_edge_types: Vec<String>,
    /// Chunks below this position are treated as front matter and skipped.
    pub min_chunk_position: i64,
    /// Suffix appended to document names that lack it.
    pub document_extension: String,
    pub vector_limit: usize,
    pub vector_similarity_threshold: f64,
    /// Hop bound for the re-ranking the chunk search backend may perform.
    pub vector_max_hops: usize,
    /// Chunks per document attached to the synthesis prompt.
    pub synthesis_first_k: usize,
    /// Optional similarity floor for entity resolution. `None` accepts any top-1 match.
    pub min_entity_score: Option<f64>,
    /// Sort traversal rows by node ids before capping.
    pub deterministic_paths: bool,
    /// Per-call deadline for every collaborator round trip.
    pub call_timeout_secs: Option<u64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            paths_per_entity: 10,
            excluded_edge_types: vec!["HAS_ENTITY".to_string(), "MENTIONS".to_string()],
            min_chunk_position: 5,
            document_extension: ".pdf".to_string(),
            vector_limit: 20,
            vector_similarity_threshold: 0.8,
            vector_max_hops: 1,
            synthesis_first_k: 10,
            min_entity_score: None,
            deterministic_paths: false,
            call_timeout_secs: None,
        }
    }
}

impl RetrievalConfig {

    #[must_use]
    pub fn call_deadline(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {

    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub timeout: u64,


    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,


    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,


    pub prompts_path: String,
    pub default_template: String,

    pub retrieval: RetrievalConfig,
}

impl SynthConfig {

    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            api_key: None,
            timeout: 30,

            llm_provider: "openai".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.3,

            llm_fallback_enabled: false,
            llm_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            embedding_provider: "ollama".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,

            embedding_fallback_enabled: true,
            embedding_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: DEFAULT_EMBEDDING_MODEL.to_string(),

            prompts_path: DEFAULT_PROMPTS_PATH.to_string(),
            default_template: DEFAULT_SYNTHESIS_TEMPLATE.to_string(),

            retrieval: RetrievalConfig::default(),
        }
    }


    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Layers built-in defaults, an optional config file and `SYNTH_*` env vars.
    ///
    /// Nested keys use a double underscore: `SYNTH_RETRIEVAL__MAX_DEPTH=3`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix("SYNTH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        info!(
            "Configuration loaded: graph={}, llm={}/{}, embeddings={}/{}",
            config.base_url(),
            config.llm_provider,
            config.llm_model,
            config.embedding_provider,
            config.embedding_model
        );

        Ok(config)
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_HELIX_PORT)
    }
}
