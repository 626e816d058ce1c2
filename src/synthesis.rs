

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::core::config::SynthConfig;
use crate::core::error::{Result, SynthError};
use crate::core::retrieval_modes::RetrievalMode;
use crate::db::client::HelixClient;
use crate::db::helix_store::HelixChunkSearcher;
use crate::llm::embeddings::Embedder;
use crate::llm::extractor::LlmEntityExtractor;
use crate::llm::factory::{EmbeddingProviderFactory, LlmProviderFactory};
use crate::llm::prompt::{PromptAssembler, TemplateStore, YamlTemplateStore};
use crate::llm::providers::base::{ChatMessage, ChatOptions, LlmMetadata, LlmProvider};
use crate::retrieval::builder::HybridContextBuilder;
use crate::retrieval::chunks::ChunkFetcher;
use crate::retrieval::collector::PathCollector;
use crate::retrieval::models::{ChunkRecord, CompositeContext};
use crate::retrieval::resolver::EntityResolver;


/// Everything sent to the completion service for one query.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPrompt {
    pub messages: Vec<ChatMessage>,
    pub context: CompositeContext,
    pub filenames: Vec<String>,
    pub chunks: Vec<ChunkRecord>,
}


#[derive(Debug, Clone, Serialize)]
pub struct SynthesisOutcome {
    pub answer: String,
    pub context: CompositeContext,
    pub filenames: Vec<String>,
    pub metadata: LlmMetadata,
}


/// Context build, template lookup, lead chunks, then one completion call.
pub struct Synthesizer {
    builder: HybridContextBuilder,
    fetcher: ChunkFetcher,
    templates: Arc<dyn TemplateStore>,
    completion: Arc<dyn LlmProvider>,
    first_k: usize,
    temperature: f64,
}

impl Synthesizer {

    pub fn new(
        builder: HybridContextBuilder,
        fetcher: ChunkFetcher,
        templates: Arc<dyn TemplateStore>,
        completion: Arc<dyn LlmProvider>,
    ) -> Self {
        let first_k = builder.config().synthesis_first_k;
        Self {
            builder,
            fetcher,
            templates,
            completion,
            first_k,
            temperature: 0.3,
        }
    }


    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Wires the HelixDB backend, configured providers and the YAML template file.
    pub fn from_config(config: &SynthConfig) -> Result<Self> {
        info!("Initializing Synthesizer with HelixDB at {}", config.base_url());

        let retrieval = config.retrieval.clone();
        let deadline = retrieval.call_deadline();

        let client = Arc::new(HelixClient::from_config(config));
        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingProviderFactory::from_config(config));
        let completion = LlmProviderFactory::from_config(config)?;

        let resolver = EntityResolver::new(
            Arc::new(LlmEntityExtractor::new(completion.clone())),
            embedder.clone(),
            client.clone(),
        )
        .with_min_score(retrieval.min_entity_score)
        .with_deadline(deadline);

        let collector = PathCollector::new(
            client.clone(),
            retrieval.excluded_edge_types.clone(),
            retrieval.paths_per_entity,
        )
        .deterministic(retrieval.deterministic_paths)
        .with_deadline(deadline);

        let fetcher = ChunkFetcher::new(
            client.clone(),
            retrieval.document_extension.clone(),
            retrieval.min_chunk_position,
        )
        .with_deadline(deadline);

        let searcher = Arc::new(HelixChunkSearcher::new(client, embedder));
        let builder = HybridContextBuilder::new(resolver, collector, searcher, retrieval);
        let templates = Arc::new(YamlTemplateStore::load_or_empty(&config.prompts_path));

        Ok(Self::new(builder, fetcher, templates, completion).with_temperature(config.llm_temperature))
    }


    /// [`from_config`](Self::from_config) after confirming HelixDB answers.
    pub async fn connect(config: &SynthConfig) -> Result<Self> {
        HelixClient::from_config(config)
            .health_check()
            .await
            .map_err(|e| SynthError::Connection(e.to_string()))?;
        Self::from_config(config)
    }


    pub fn builder(&self) -> &HybridContextBuilder {
        &self.builder
    }


    pub async fn prepare(&self, query: &str, mode: RetrievalMode, template: &str) -> PreparedPrompt {
        let (context, filenames) = self.builder.build(query, mode).await;
        let system_template = self.templates.template(template);
        let chunks = self.fetcher.fetch(&filenames, self.first_k).await;
        let messages = PromptAssembler::assemble(&system_template, query, &context, &chunks);

        PreparedPrompt {
            messages,
            context,
            filenames,
            chunks,
        }
    }


    pub async fn synthesize(
        &self,
        query: &str,
        mode: RetrievalMode,
        template: &str,
        model: Option<&str>,
    ) -> Result<SynthesisOutcome> {
        let prepared = self.prepare(query, mode, template).await;

        let options = ChatOptions {
            model: model.map(String::from),
            temperature: Some(self.temperature),
            response_format: None,
        };
        let (answer, metadata) = self.completion.chat(&prepared.messages, &options).await?;

        info!(
            "Synthesized answer ({} chars, {} documents, model={}) for query: {}",
            answer.len(),
            prepared.filenames.len(),
            metadata.model,
            crate::preview(query, 50)
        );

        Ok(SynthesisOutcome {
            answer,
            context: prepared.context,
            filenames: prepared.filenames,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RetrievalConfig;
    use crate::db::memory::{InMemoryChunkSearcher, InMemoryGraph};
    use crate::llm::providers::base::{ChatRole, LlmProviderError};
    use crate::retrieval::resolver::tests::{FixedExtractor, TableEmbedder};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Echoes a fixed answer and keeps the last request.
    #[derive(Default)]
    struct RecordingProvider {
        fail: bool,
        last: Mutex<Option<(Vec<ChatMessage>, ChatOptions)>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> std::result::Result<(String, LlmMetadata), LlmProviderError> {
            *self.last.lock() = Some((messages.to_vec(), options.clone()));
            if self.fail {
                return Err(LlmProviderError::Provider("rate limited".to_string()));
            }
            Ok((
                "Supports: MENDS".to_string(),
                LlmMetadata {
                    provider: "recording".to_string(),
                    model: options.model.clone().unwrap_or_default(),
                    ..Default::default()
                },
            ))
        }

        fn provider_name(&self) -> &str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct Templates;

    impl TemplateStore for Templates {
        fn template(&self, name: &str) -> String {
            match name {
                "stance_synthesis" => "Classify each paper's stance.".to_string(),
                _ => String::new(),
            }
        }
    }

    fn synthesizer(provider: Arc<RecordingProvider>) -> Synthesizer {
        let embedder = Arc::new(TableEmbedder(HashMap::from([
            ("delirium", vec![0.0, 1.0]),
            ("dex for delirium?", vec![0.0, 1.0]),
        ])));

        let mut graph = InMemoryGraph::new();
        graph
            .add_node("Delirium", "acute confusion", Some(vec![0.0, 1.0]))
            .add_edge("Dexmedetomidine", "REDUCES", "Delirium")
            .add_chunk("MENDS.pdf", 3, 1, "Title", Some(vec![0.0, 1.0]))
            .add_chunk("MENDS.pdf", 5, 2, "Methods", None)
            .add_chunk("MENDS.pdf", 6, 2, "Results", Some(vec![0.0, 1.0]));
        let graph = Arc::new(graph);

        let config = RetrievalConfig::default();
        let resolver = EntityResolver::new(Arc::new(FixedExtractor(vec!["delirium"])), embedder.clone(), graph.clone());
        let collector = PathCollector::new(graph.clone(), config.excluded_edge_types.clone(), config.paths_per_entity);
        let searcher = Arc::new(InMemoryChunkSearcher::new(graph.clone(), embedder));
        let fetcher = ChunkFetcher::new(graph, ".pdf", config.min_chunk_position);
        let builder = HybridContextBuilder::new(resolver, collector, searcher, config);

        Synthesizer::new(builder, fetcher, Arc::new(Templates), provider)
    }

    #[tokio::test]
    async fn test_prepare_assembles_three_messages() {
        let synth = synthesizer(Arc::new(RecordingProvider::default()));
        let prepared = synth.prepare("dex for delirium?", RetrievalMode::Hybrid, "stance_synthesis").await;

        assert_eq!(prepared.filenames, vec!["MENDS.pdf"]);
        assert_eq!(prepared.chunks.len(), 1);
        assert_eq!(prepared.chunks[0].filename, "MENDS");
        assert_eq!(prepared.chunks[0].metadata.positions, vec![5, 6]);

        assert_eq!(prepared.messages.len(), 3);
        assert!(prepared.messages[0]
            .content
            .starts_with("Classify each paper's stance.\n\nUser Query: dex for delirium?\nContext: Query: dex for delirium?"));
        assert!(prepared.messages[0].content.contains("- Dexmedetomidine -> reduces -> Delirium"));
        assert!(prepared.messages[1].content.contains("\"Methods\""));
        assert_eq!(prepared.messages[2].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_graph_mode_fetches_no_chunks() {
        let synth = synthesizer(Arc::new(RecordingProvider::default()));
        let prepared = synth.prepare("dex for delirium?", RetrievalMode::Graph, "unknown_template").await;

        assert!(prepared.filenames.is_empty());
        assert!(prepared.chunks.is_empty());
        assert_eq!(prepared.messages[1].content, "[]");
        assert!(prepared.messages[0].content.starts_with("\n\nUser Query: "));
    }

    #[tokio::test]
    async fn test_synthesize_passes_model_and_temperature() {
        let provider = Arc::new(RecordingProvider::default());
        let synth = synthesizer(provider.clone());

        let outcome = synth
            .synthesize("dex for delirium?", RetrievalMode::Vector, "stance_synthesis", Some("gpt-4"))
            .await
            .unwrap();
        assert_eq!(outcome.answer, "Supports: MENDS");
        assert_eq!(outcome.metadata.model, "gpt-4");

        let (messages, options) = provider.last.lock().clone().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.model.as_deref(), Some("gpt-4"));
    }

    #[tokio::test]
    async fn test_completion_failure_is_provider_error() {
        let synth = synthesizer(Arc::new(RecordingProvider {
            fail: true,
            ..Default::default()
        }));
        let err = synth
            .synthesize("dex for delirium?", RetrievalMode::Graph, "stance_synthesis", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SynthError::LlmProvider(_)));
    }
}
