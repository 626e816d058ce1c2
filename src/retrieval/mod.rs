//! Context retrieval core.
//!
//! Graph branch: [`EntityResolver`] -> [`PathCollector`] -> [`PathFormatter`].
//! Vector branch: a [`ChunkSearcher`](crate::db::ChunkSearcher) query rendered
//! as a `(file, text)` listing. [`HybridContextBuilder`] selects and merges
//! the branches; [`ChunkFetcher`] supplies lead chunks for cited documents.

pub mod builder;
pub mod chunks;
pub mod collector;
pub mod formatter;
pub mod models;
pub mod resolver;

pub use builder::{render_vector_listing, ContextBuild, HybridContextBuilder, HYBRID_SEPARATOR, VECTOR_CONTEXT_PREAMBLE};
pub use chunks::ChunkFetcher;
pub use collector::PathCollector;
pub use formatter::{PathFormatter, NO_RELATIONSHIPS};
pub use models::{
    ChunkMetadata, ChunkRecord, CompositeContext, Direction, EntityMapping, GraphContext, GraphContextMetadata,
    GraphEvidence, RelationshipDescriptor, RelationshipPath,
};
pub use resolver::{EntityResolver, Resolution};
