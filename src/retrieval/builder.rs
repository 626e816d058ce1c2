

use std::sync::Arc;

use tracing::{debug, error, info};

use super::collector::PathCollector;
use super::formatter::PathFormatter;
use super::models::{CompositeContext, GraphContext, GraphContextMetadata, GraphEvidence};
use super::resolver::EntityResolver;
use crate::core::config::RetrievalConfig;
use crate::core::error::RetrievalError;
use crate::core::retrieval_modes::RetrievalMode;
use crate::db::store::{ChunkHit, ChunkSearchParams, ChunkSearcher};
use crate::utils::with_deadline;


pub const VECTOR_CONTEXT_PREAMBLE: &str = "Given the following context in the format [(File Name, Text),...] \n";

/// Joins the graph statements and the vector listing in hybrid mode.
pub const HYBRID_SEPARATOR: &str = "\n And ";


/// A built context and the distinct documents its vector branch cited.
pub type ContextBuild = (CompositeContext, Vec<String>);


/// Runs the graph branch, the vector branch, or both, and merges their text.
///
/// Stateless across calls. Branch failures other than extraction surface as
/// [`RetrievalError::ContextBuild`] from [`try_build`](Self::try_build);
/// [`build`](Self::build) turns them into an error-annotated context.
pub struct HybridContextBuilder {
    resolver: EntityResolver,
    collector: PathCollector,
    searcher: Arc<dyn ChunkSearcher>,
    config: RetrievalConfig,
}

impl HybridContextBuilder {

    pub fn new(
        resolver: EntityResolver,
        collector: PathCollector,
        searcher: Arc<dyn ChunkSearcher>,
        config: RetrievalConfig,
    ) -> Self {
        info!(
            "Initializing HybridContextBuilder: max_depth={}, vector_limit={}, threshold={}",
            config.max_depth, config.vector_limit, config.vector_similarity_threshold
        );
        Self {
            resolver,
            collector,
            searcher,
            config,
        }
    }


    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Resolves entities and collects their paths. A failed extraction is an
    /// `Ok(GraphContext::Failed)`; collaborator failures are errors.
    pub async fn graph_context(&self, query: &str) -> Result<GraphContext, RetrievalError> {
        let resolution = match self.resolver.resolve_detailed(query).await {
            Ok(resolution) => resolution,
            Err(RetrievalError::Extraction(reason)) => {
                debug!("Extraction failed for query: {}", reason);
                return Ok(GraphContext::Failed {
                    error: "Failed to extract entities from query".to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let relationships = self.collector.collect(&resolution.mappings, self.config.max_depth).await?;

        Ok(GraphContext::Found(GraphEvidence {
            query: query.to_string(),
            metadata: GraphContextMetadata {
                num_entities: resolution.extracted.len(),
                num_paths: relationships.len(),
                max_depth: self.config.max_depth,
            },
            entities: resolution.mappings,
            relationships,
        }))
    }


    pub async fn graph_branch(&self, query: &str) -> Result<String, RetrievalError> {
        let context = self.graph_context(query).await?;
        Ok(PathFormatter::format_context(&context))
    }

    /// Preamble plus `(file, text)` listing, and the distinct filenames in
    /// first-seen order.
    pub async fn vector_branch(&self, query: &str) -> Result<(String, Vec<String>), RetrievalError> {
        let params = ChunkSearchParams {
            limit: self.config.vector_limit,
            similarity_threshold: self.config.vector_similarity_threshold,
            max_hops: self.config.vector_max_hops,
        };

        let hits = with_deadline(
            self.config.call_deadline(),
            async {
                self.searcher
                    .search(query, &params)
                    .await
                    .map_err(|e| RetrievalError::ContextBuild(format!("vector search failed: {}", e)))
            },
            |limit| RetrievalError::ContextBuild(format!("vector search timed out after {}ms", limit.as_millis())),
        )
        .await?;

        let hits: Vec<ChunkHit> = hits.into_iter().filter(|h| !h.text.is_empty()).collect();

        let mut filenames: Vec<String> = Vec::new();
        for hit in &hits {
            if !filenames.contains(&hit.filename) {
                filenames.push(hit.filename.clone());
            }
        }

        debug!("Vector branch: {} chunks from {} documents", hits.len(), filenames.len());
        Ok((format!("{}{}", VECTOR_CONTEXT_PREAMBLE, render_vector_listing(&hits)), filenames))
    }


    pub async fn try_build(&self, query: &str, mode: RetrievalMode) -> Result<ContextBuild, RetrievalError> {
        debug!("Building {} context: {}", mode, mode.description());

        let vector = if mode.uses_vector() {
            Some(self.vector_branch(query).await?)
        } else {
            None
        };
        let graph = if mode.uses_graph() {
            Some(self.graph_branch(query).await.map_err(into_build_error)?)
        } else {
            None
        };

        let build: ContextBuild = match (graph, vector) {
            (Some(graph), Some((listing, filenames))) => {
                (format!("{}{}{}", graph, HYBRID_SEPARATOR, listing).into(), filenames)
            }
            (Some(graph), None) => (graph.into(), Vec::new()),
            (None, Some((listing, filenames))) => (listing.into(), filenames),
            (None, None) => (CompositeContext::empty(), Vec::new()),
        };

        info!(
            "Built {} context ({} chars, {} documents) for query: {}",
            mode,
            build.0.as_str().len(),
            build.1.len(),
            crate::preview(query, 50)
        );
        Ok(build)
    }

    /// Never fails: an unrecoverable branch error becomes an `Error: ...`
    /// context with no filenames.
    pub async fn build(&self, query: &str, mode: RetrievalMode) -> ContextBuild {
        match self.try_build(query, mode).await {
            Ok(build) => build,
            Err(e) => {
                error!("Context build failed for mode {}: {}", mode, e);
                (CompositeContext::from(format!("Error: {}", e)), Vec::new())
            }
        }
    }
}


fn into_build_error(e: RetrievalError) -> RetrievalError {
    match e {
        RetrievalError::ContextBuild(_) => e,
        other => RetrievalError::ContextBuild(other.to_string()),
    }
}

/// `[('file', 'text'), ...]` with Python-style string quoting.
pub fn render_vector_listing(hits: &[ChunkHit]) -> String {
    let pairs: Vec<String> = hits
        .iter()
        .map(|h| format!("({}, {})", quote_listing_str(&h.filename), quote_listing_str(&h.text)))
        .collect();
    format!("[{}]", pairs.join(", "))
}

/// Single quotes unless the text holds a single quote and no double quote.
fn quote_listing_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
