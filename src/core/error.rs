

use thiserror::Error;

use crate::llm::embeddings::EmbeddingError;
use crate::llm::providers::LlmProviderError;


/// Failure categories of a single retrieval request.
///
/// `Extraction` ends the graph branch with a tagged error context. `Traversal`
/// and `Embedding` propagate. Per-file chunk failures never surface here; they
/// are logged and skipped by the fetcher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Entity extraction failed: {0}")]
    Extraction(String),

    #[error("Entity embedding failed: {0}")]
    Embedding(String),

    #[error("Graph traversal failed: {0}")]
    Traversal(String),

    #[error("Chunk fetch failed: {0}")]
    ChunkFetch(String),

    #[error("Context build failed: {0}")]
    ContextBuild(String),

    #[error("Template load failed: {0}")]
    TemplateLoad(String),
}


#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HelixDB connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}


pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_messages() {
        let err = RetrievalError::Traversal("graph query timed out after 50ms".into());
        assert_eq!(err.to_string(), "Graph traversal failed: graph query timed out after 50ms");
    }

    #[test]
    fn test_retrieval_error_is_transparent_in_synth_error() {
        let err: SynthError = RetrievalError::ContextBuild("boom".into()).into();
        assert_eq!(err.to_string(), "Context build failed: boom");
    }
}
