

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::HelixClient;
use super::store::{
    ChunkHit, ChunkSearchParams, ChunkSearcher, ChunkStore, GraphStore, NodeIndex, NodeMatch, StoreError,
    StoredChunk, TraversalRequest, TraversalRow,
};
use crate::llm::embeddings::Embedder;


const SEARCH_ENTITY_NODES: &str = "searchEntityNodes";

const GET_ENTITY_PATHS: &str = "getEntityPaths";

const GET_DOCUMENT_CHUNKS: &str = "getDocumentChunks";

const SEARCH_CHUNKS: &str = "searchChunks";

/// Row ceiling sent with uncapped traversals; the named query requires a limit.
const MAX_PATH_ROWS: usize = 10_000;


#[derive(Serialize)]
struct NearestParams<'a> {
    vector: &'a [f32],
    k: usize,
}

#[derive(Deserialize)]
struct NearestOutput {
    #[serde(default)]
    nodes: Vec<NodeMatch>,
}

#[derive(Serialize)]
struct PathParams<'a> {
    anchor_id: &'a str,
    max_depth: usize,
    excluded_types: &'a [String],
    limit: usize,
}

impl<'a> PathParams<'a> {
    fn from_request(request: &TraversalRequest<'a>) -> Self {
        Self {
            anchor_id: request.anchor,
            max_depth: request.max_depth,
            excluded_types: request.excluded_edge_types,
            limit: request.limit.unwrap_or(MAX_PATH_ROWS),
        }
    }
}

#[derive(Deserialize)]
struct PathOutput {
    #[serde(default)]
    paths: Vec<TraversalRow>,
}

#[derive(Serialize)]
struct ChunkParams<'a> {
    file_name: &'a str,
    min_position: i64,
    limit: usize,
}

#[derive(Deserialize)]
struct ChunkOutput {
    #[serde(default)]
    chunks: Vec<StoredChunk>,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query_vector: &'a [f32],
    limit: usize,
    similarity_threshold: f64,
    max_hops: usize,
}

#[derive(Deserialize)]
struct SearchOutput {
    #[serde(default)]
    chunks: Vec<ChunkHit>,
}


#[async_trait]
impl NodeIndex for HelixClient {
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<NodeMatch>, StoreError> {
        let output: NearestOutput = self
            .execute_query(SEARCH_ENTITY_NODES, &NearestParams { vector, k })
            .await?;

        let mut nodes = output.nodes;
        nodes.truncate(k);
        Ok(nodes)
    }
}


#[async_trait]
impl GraphStore for HelixClient {
    async fn traverse(&self, request: &TraversalRequest<'_>) -> Result<Vec<TraversalRow>, StoreError> {
        let params = PathParams::from_request(request);
        let output: PathOutput = self.execute_query(GET_ENTITY_PATHS, &params).await?;
        debug!("{} returned {} rows for {}", GET_ENTITY_PATHS, output.paths.len(), request.anchor);
        if request.limit.is_none() && output.paths.len() >= MAX_PATH_ROWS {
            warn!("{} hit the {} row ceiling for {}", GET_ENTITY_PATHS, MAX_PATH_ROWS, request.anchor);
        }
        Ok(output.paths)
    }
}


#[async_trait]
impl ChunkStore for HelixClient {
    async fn chunks(&self, filename: &str, min_position: i64, limit: usize) -> Result<Vec<StoredChunk>, StoreError> {
        let params = ChunkParams {
            file_name: filename,
            min_position,
            limit,
        };

        let output: ChunkOutput = self.execute_query(GET_DOCUMENT_CHUNKS, &params).await?;
        Ok(output.chunks)
    }
}


/// Chunk similarity search backed by HelixDB; the query is embedded client-side.
pub struct HelixChunkSearcher {
    client: Arc<HelixClient>,
    embedder: Arc<dyn Embedder>,
}

impl HelixChunkSearcher {

    pub fn new(client: Arc<HelixClient>, embedder: Arc<dyn Embedder>) -> Self {
        Self { client, embedder }
    }
}

#[async_trait]
impl ChunkSearcher for HelixChunkSearcher {
    async fn search(&self, query: &str, params: &ChunkSearchParams) -> Result<Vec<ChunkHit>, StoreError> {
        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| StoreError::Unavailable(format!("query embedding failed: {}", e)))?;

        let output: SearchOutput = self
            .client
            .execute_query(
                SEARCH_CHUNKS,
                &SearchParams {
                    query_vector: &query_vector,
                    limit: params.limit,
                    similarity_threshold: params.similarity_threshold,
                    max_hops: params.max_hops,
                },
            )
            .await?;

        let mut chunks = output.chunks;
        chunks.truncate(params.limit);
        Ok(chunks)
    }
}
