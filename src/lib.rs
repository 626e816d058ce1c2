//! Hybrid context retrieval for evidence synthesis over scientific documents.
//!
//! A question is answered from two independent sources of evidence: relationship
//! paths walked out of an entity graph, and text chunks found by vector
//! similarity. [`retrieval::HybridContextBuilder`] merges both into one
//! prompt-ready context; [`synthesis::Synthesizer`] hands it to a chat model.

pub mod core;
pub mod db;
pub mod evaluation;
pub mod llm;
pub mod retrieval;
pub mod synthesis;
pub mod utils;

pub use utils::{preview, with_deadline};


pub use crate::core::config::{RetrievalConfig, SynthConfig};
pub use crate::core::error::{Result, RetrievalError, SynthError};
pub use crate::core::retrieval_modes::RetrievalMode;
pub use db::{HelixClient, HelixClientError, InMemoryGraph};
pub use retrieval::{CompositeContext, HybridContextBuilder};
pub use synthesis::Synthesizer;


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";


pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";


pub const DEFAULT_LLM_MODEL: &str = "gpt-4";


pub const DEFAULT_HELIX_PORT: u16 = 6969;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;


pub const DEFAULT_PROMPTS_PATH: &str = "sysprompts.yaml";


pub const DEFAULT_SYNTHESIS_TEMPLATE: &str = "stance_synthesis";
