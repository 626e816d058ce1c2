//! Read-only capabilities the retrieval core needs from its backends.
//!
//! Any backend (HelixDB, an in-memory adjacency map, a property-graph server)
//! plugs in by implementing these traits. The core never mutates the stores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::client::HelixClientError;


pub type NodeId = String;


#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Malformed store response: {0}")]
    Malformed(String),
}

impl From<HelixClientError> for StoreError {
    fn from(e: HelixClientError) -> Self {
        match e {
            HelixClientError::Connection(_) | HelixClientError::RetryExhausted(_, _) => Self::Unavailable(e.to_string()),
            HelixClientError::Serialization(_) => Self::Malformed(e.to_string()),
            HelixClientError::Query(_) | HelixClientError::Helix(_) => Self::Query(e.to_string()),
        }
    }
}


/// A nearest-neighbour hit in the entity node index, in the index's native score scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeMatch {
    pub id: NodeId,
    pub score: f64,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PathNode {
    pub id: NodeId,
    #[serde(default)]
    pub text: String,
}


/// One traversed edge, with its stored orientation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraversalHop {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: NodeId,
    pub end: NodeId,
}


/// One raw path row as returned by a graph backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraversalRow {
    pub source: NodeId,
    #[serde(default)]
    pub source_text: String,
    pub hops: Vec<TraversalHop>,
    pub nodes: Vec<PathNode>,
}


#[derive(Debug, Clone, Copy)]
pub struct TraversalRequest<'a> {
    pub anchor: &'a str,
    pub max_depth: usize,
    pub excluded_edge_types: &'a [String],
    /// `None` asks for every row the walk produces.
    pub limit: Option<usize>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    pub text: String,
    pub position: i64,
    #[serde(default)]
    pub page: i64,
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChunkSearchParams {
    pub limit: usize,
    pub similarity_threshold: f64,
    pub max_hops: usize,
}


/// A similarity-ranked chunk from the document index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkHit {
    pub filename: String,
    pub text: String,
    #[serde(default)]
    pub score: f64,
}


#[async_trait]
pub trait NodeIndex: Send + Sync {
    /// Up to `k` entity nodes closest to `vector`, best first. Empty when none match.
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<NodeMatch>, StoreError>;
}


#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Paths of 1..=`max_depth` hops touching `anchor`, walked without regard to
    /// edge orientation. Implementations should honour the exclusion list and
    /// limit; callers re-check both.
    async fn traverse(&self, request: &TraversalRequest<'_>) -> Result<Vec<TraversalRow>, StoreError>;
}


#[async_trait]
pub trait ChunkStore: Send + Sync {

    async fn chunks(&self, filename: &str, min_position: i64, limit: usize) -> Result<Vec<StoredChunk>, StoreError>;
}


#[async_trait]
pub trait ChunkSearcher: Send + Sync {

    async fn search(&self, query: &str, params: &ChunkSearchParams) -> Result<Vec<ChunkHit>, StoreError>;
}
