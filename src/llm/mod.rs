

pub mod embeddings;
pub mod extractor;
pub mod factory;
pub mod prompt;
pub mod providers;

pub use embeddings::{Embedder, EmbeddingGenerator};
pub use extractor::{EntityExtractor, Extraction, LlmEntityExtractor, EXTRACTION_FAILURE_SENTINEL};
pub use factory::{EmbeddingProviderFactory, LlmProviderFactory};
pub use prompt::{PromptAssembler, TemplateStore, YamlTemplateStore};
pub use providers::{ChatMessage, ChatOptions, LlmProvider};
