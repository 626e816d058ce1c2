//! In-memory adjacency backend for tests and small corpora.
//!
//! Nearest-neighbour lookups and chunk search are brute-force cosine
//! similarity. Traversal walks edges in insertion order, so results are
//! stable across runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::store::{
    ChunkHit, ChunkSearchParams, ChunkSearcher, ChunkStore, GraphStore, NodeIndex, NodeMatch, PathNode, StoreError,
    StoredChunk, TraversalHop, TraversalRequest, TraversalRow,
};
use crate::llm::embeddings::Embedder;

struct StoredNode {
    id: String,
    text: String,
    embedding: Option<Vec<f32>>,
}

struct StoredEdge {
    rel_type: String,
    start: usize,
    end: usize,
}

struct DocumentChunk {
    filename: String,
    position: i64,
    page: i64,
    text: String,
    embedding: Option<Vec<f32>>,
}


#[derive(Default)]
pub struct InMemoryGraph {
    nodes: Vec<StoredNode>,
    index: HashMap<String, usize>,
    edges: Vec<StoredEdge>,
    adjacency: Vec<Vec<usize>>,
    chunks: Vec<DocumentChunk>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity node, or updates text and embedding of an existing one.
    pub fn add_node(&mut self, id: &str, text: &str, embedding: Option<Vec<f32>>) -> &mut Self {
        let idx = self.node_index(id);
        let node = &mut self.nodes[idx];
        node.text = text.to_string();
        if embedding.is_some() {
            node.embedding = embedding;
        }
        self
    }

    /// Adds a typed edge `start -[rel_type]-> end`, creating bare nodes as needed.
    pub fn add_edge(&mut self, start: &str, rel_type: &str, end: &str) -> &mut Self {
        let start = self.node_index(start);
        let end = self.node_index(end);
        let edge_idx = self.edges.len();

        self.edges.push(StoredEdge {
            rel_type: rel_type.to_string(),
            start,
            end,
        });
        self.adjacency[start].push(edge_idx);
        if end != start {
            self.adjacency[end].push(edge_idx);
        }
        self
    }


    pub fn add_chunk(
        &mut self,
        filename: &str,
        position: i64,
        page: i64,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> &mut Self {
        self.chunks.push(DocumentChunk {
            filename: filename.to_string(),
            position,
            page,
            text: text.to_string(),
            embedding,
        });
        self
    }


    /// Chunks at or above `similarity_threshold`, best first, each followed by
    /// same-document neighbours within `max_hops` positions.
    pub fn search_chunks(&self, vector: &[f32], params: &ChunkSearchParams) -> Vec<ChunkHit> {
        let mut seeds: Vec<(usize, f64)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(idx, chunk)| {
                let embedding = chunk.embedding.as_deref()?;
                let score = f64::from(cosine_sim(vector, embedding));
                (score >= params.similarity_threshold).then_some((idx, score))
            })
            .collect();
        seeds.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut seen: HashSet<usize> = HashSet::new();
        let mut hits = Vec::new();

        for (seed_idx, score) in seeds {
            if hits.len() >= params.limit {
                break;
            }
            if seen.insert(seed_idx) {
                hits.push(self.hit(seed_idx, score));
            }

            let seed = &self.chunks[seed_idx];
            let mut neighbours: Vec<usize> = (0..self.chunks.len())
                .filter(|&idx| {
                    let chunk = &self.chunks[idx];
                    chunk.filename == seed.filename
                        && chunk.position != seed.position
                        && (chunk.position - seed.position).unsigned_abs() <= params.max_hops as u64
                })
                .collect();
            neighbours.sort_by_key(|&idx| self.chunks[idx].position);

            for idx in neighbours {
                if hits.len() >= params.limit {
                    break;
                }
                if seen.insert(idx) {
                    hits.push(self.hit(idx, score));
                }
            }
        }

        hits
    }

    fn hit(&self, idx: usize, score: f64) -> ChunkHit {
        let chunk = &self.chunks[idx];
        ChunkHit {
            filename: chunk.filename.clone(),
            text: chunk.text.clone(),
            score,
        }
    }

    fn node_index(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(StoredNode {
            id: id.to_string(),
            text: String::new(),
            embedding: None,
        });
        self.adjacency.push(Vec::new());
        self.index.insert(id.to_string(), idx);
        idx
    }

    fn walk(
        &self,
        anchor: usize,
        current: usize,
        request: &TraversalRequest<'_>,
        used: &mut Vec<usize>,
        trail: &mut Vec<usize>,
        rows: &mut Vec<TraversalRow>,
    ) {
        if used.len() >= request.max_depth {
            return;
        }

        for &edge_idx in &self.adjacency[current] {
            if request.limit.is_some_and(|limit| rows.len() >= limit) {
                return;
            }
            if used.contains(&edge_idx) {
                continue;
            }
            let edge = &self.edges[edge_idx];
            if request.excluded_edge_types.iter().any(|t| *t == edge.rel_type) {
                continue;
            }

            let next = if edge.start == current { edge.end } else { edge.start };
            used.push(edge_idx);
            trail.push(next);

            rows.push(self.row(anchor, used, trail));
            self.walk(anchor, next, request, used, trail, rows);

            used.pop();
            trail.pop();
        }
    }

    fn row(&self, anchor: usize, used: &[usize], trail: &[usize]) -> TraversalRow {
        let anchor = &self.nodes[anchor];
        TraversalRow {
            source: anchor.id.clone(),
            source_text: anchor.text.clone(),
            hops: used
                .iter()
                .map(|&edge_idx| {
                    let edge = &self.edges[edge_idx];
                    TraversalHop {
                        rel_type: edge.rel_type.clone(),
                        start: self.nodes[edge.start].id.clone(),
                        end: self.nodes[edge.end].id.clone(),
                    }
                })
                .collect(),
            nodes: trail
                .iter()
                .map(|&idx| PathNode {
                    id: self.nodes[idx].id.clone(),
                    text: self.nodes[idx].text.clone(),
                })
                .collect(),
        }
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}


#[async_trait]
impl NodeIndex for InMemoryGraph {
    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<NodeMatch>, StoreError> {
        let mut matches: Vec<NodeMatch> = self
            .nodes
            .iter()
            .filter_map(|node| {
                let embedding = node.embedding.as_deref()?;
                Some(NodeMatch {
                    id: node.id.clone(),
                    score: f64::from(cosine_sim(vector, embedding)),
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);
        Ok(matches)
    }
}


#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn traverse(&self, request: &TraversalRequest<'_>) -> Result<Vec<TraversalRow>, StoreError> {
        let Some(&anchor) = self.index.get(request.anchor) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        let mut used = Vec::new();
        let mut trail = vec![anchor];
        self.walk(anchor, anchor, request, &mut used, &mut trail, &mut rows);
        Ok(rows)
    }
}


#[async_trait]
impl ChunkStore for InMemoryGraph {
    async fn chunks(&self, filename: &str, min_position: i64, limit: usize) -> Result<Vec<StoredChunk>, StoreError> {
        let mut chunks: Vec<StoredChunk> = self
            .chunks
            .iter()
            .filter(|c| c.filename == filename && c.position >= min_position)
            .map(|c| StoredChunk {
                text: c.text.clone(),
                position: c.position,
                page: c.page,
            })
            .collect();

        chunks.sort_by_key(|c| c.position);
        chunks.truncate(limit);
        Ok(chunks)
    }
}


pub struct InMemoryChunkSearcher {
    graph: Arc<InMemoryGraph>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryChunkSearcher {
    pub fn new(graph: Arc<InMemoryGraph>, embedder: Arc<dyn Embedder>) -> Self {
        Self { graph, embedder }
    }
}

#[async_trait]
impl ChunkSearcher for InMemoryChunkSearcher {
    async fn search(&self, query: &str, params: &ChunkSearchParams) -> Result<Vec<ChunkHit>, StoreError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| StoreError::Unavailable(format!("query embedding failed: {}", e)))?;
        Ok(self.graph.search_chunks(&vector, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(anchor: &'a str, max_depth: usize, excluded: &'a [String], limit: usize) -> TraversalRequest<'a> {
        TraversalRequest {
            anchor,
            max_depth,
            excluded_edge_types: excluded,
            limit: Some(limit),
        }
    }

    fn sepsis_graph() -> InMemoryGraph {
        let mut graph = InMemoryGraph::new();
        graph
            .add_node("hydrocortisone", "corticosteroid", None)
            .add_edge("hydrocortisone", "TREATS", "septic shock")
            .add_edge("septic shock", "INCREASES", "mortality")
            .add_edge("adrenal insufficiency", "COMPLICATES", "septic shock")
            .add_edge("chunk-1", "MENTIONS", "hydrocortisone");
        graph
    }

    #[tokio::test]
    async fn test_traverse_walks_both_directions_up_to_depth() {
        let graph = sepsis_graph();
        let excluded = vec!["MENTIONS".to_string()];
        let rows = graph.traverse(&request("septic shock", 1, &excluded, 10)).await.unwrap();

        let ends: Vec<&str> = rows.iter().map(|r| r.nodes[1].id.as_str()).collect();
        assert_eq!(ends, vec!["hydrocortisone", "mortality", "adrenal insufficiency"]);
        assert!(rows.iter().all(|r| r.hops.len() == 1 && r.source == "septic shock"));
    }

    #[tokio::test]
    async fn test_traverse_skips_excluded_types_and_respects_limit() {
        let graph = sepsis_graph();
        let excluded = vec!["MENTIONS".to_string()];
        let rows = graph.traverse(&request("hydrocortisone", 2, &excluded, 10)).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.hops.iter().all(|h| h.rel_type != "MENTIONS")));
        assert_eq!(rows[1].nodes.len(), 3);
        assert_eq!(rows[1].hops[1].start, "septic shock");

        let capped = graph.traverse(&request("hydrocortisone", 2, &excluded, 2)).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_traverse_unknown_anchor_is_empty() {
        let graph = sepsis_graph();
        let rows = graph.traverse(&request("ghost", 2, &[], 10)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_nearest_orders_by_similarity() {
        let mut graph = InMemoryGraph::new();
        graph
            .add_node("delirium", "", Some(vec![1.0, 0.0]))
            .add_node("sedation", "", Some(vec![0.6, 0.8]))
            .add_node("no-vector", "", None);

        let hits = graph.nearest(&[1.0, 0.1], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "delirium");

        let all = graph.nearest(&[1.0, 0.1], 5).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_chunks_filter_sort_and_truncate() {
        let mut graph = InMemoryGraph::new();
        for position in (0..10).rev() {
            graph.add_chunk("ROSE.pdf", position, position / 3, &format!("chunk {}", position), None);
        }

        let chunks = graph.chunks("ROSE.pdf", 5, 3).await.unwrap();
        let positions: Vec<i64> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![5, 6, 7]);
        assert!(graph.chunks("ACURASYS.pdf", 5, 3).await.unwrap().is_empty());
    }

    #[test]
    fn test_search_chunks_expands_neighbours() {
        let mut graph = InMemoryGraph::new();
        graph
            .add_chunk("ROSE.pdf", 6, 1, "intro", Some(vec![0.0, 1.0]))
            .add_chunk("ROSE.pdf", 7, 1, "sedation outcome", Some(vec![1.0, 0.0]))
            .add_chunk("ROSE.pdf", 8, 2, "follow-up", Some(vec![0.0, 1.0]))
            .add_chunk("ACURASYS.pdf", 7, 1, "paralysis", Some(vec![0.0, 1.0]));

        let params = ChunkSearchParams {
            limit: 20,
            similarity_threshold: 0.8,
            max_hops: 1,
        };
        let hits = graph.search_chunks(&[1.0, 0.0], &params);
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["sedation outcome", "intro", "follow-up"]);

        let no_hops = graph.search_chunks(&[1.0, 0.0], &ChunkSearchParams { max_hops: 0, ..params });
        assert_eq!(no_hops.len(), 1);
    }
}
