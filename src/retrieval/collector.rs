

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::models::{Direction, EntityMapping, RelationshipDescriptor, RelationshipPath};
use crate::core::error::RetrievalError;
use crate::db::store::{GraphStore, TraversalRequest, TraversalRow};
use crate::utils::with_deadline;


/// Bounded traversal out of resolved entity nodes.
///
/// The store walks edges without regard to their orientation; each hop is
/// tagged here relative to the anchor. Rows that touch an excluded edge type
/// or exceed `max_depth` are dropped even if the store returned them.
pub struct PathCollector {
    graph: Arc<dyn GraphStore>,
    excluded_edge_types: Vec<String>,
    paths_per_entity: usize,
    deterministic: bool,
    deadline: Option<Duration>,
}

impl PathCollector {

    pub fn new(graph: Arc<dyn GraphStore>, excluded_edge_types: Vec<String>, paths_per_entity: usize) -> Self {
        info!(
            "Initializing PathCollector: excluded={:?}, paths_per_entity={}",
            excluded_edge_types, paths_per_entity
        );
        Self {
            graph,
            excluded_edge_types,
            paths_per_entity,
            deterministic: false,
            deadline: None,
        }
    }


    #[must_use]
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }


    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }


    pub async fn collect(
        &self,
        mappings: &[EntityMapping],
        max_depth: usize,
    ) -> Result<Vec<RelationshipPath>, RetrievalError> {
        if max_depth == 0 || self.paths_per_entity == 0 {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();

        for mapping in mappings {
            let request = TraversalRequest {
                anchor: &mapping.id,
                max_depth,
                excluded_edge_types: &self.excluded_edge_types,
                // Deterministic runs sort the full row set, then cap.
                limit: (!self.deterministic).then_some(self.paths_per_entity),
            };

            let rows = with_deadline(
                self.deadline,
                async {
                    self.graph
                        .traverse(&request)
                        .await
                        .map_err(|e| RetrievalError::Traversal(format!("{}: {}", mapping.id, e)))
                },
                |limit| RetrievalError::Traversal(format!("{}: timed out after {}ms", mapping.id, limit.as_millis())),
            )
            .await?;

            let mut kept: Vec<RelationshipPath> = Vec::with_capacity(rows.len());
            for row in rows {
                if let Some(path) = self.to_path(&mapping.id, row, max_depth)? {
                    kept.push(path);
                }
            }

            if self.deterministic {
                kept.sort_by(|a, b| {
                    let ids = |p: &RelationshipPath| p.path_nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
                    ids(a).cmp(&ids(b))
                });
            }
            kept.truncate(self.paths_per_entity);

            debug!("Collected {} paths from {}", kept.len(), mapping.id);
            paths.extend(kept);
        }

        info!("Collected {} paths for {} entities (max_depth={})", paths.len(), mappings.len(), max_depth);
        Ok(paths)
    }

    /// `Ok(None)` for rows filtered out by type or depth; `Err` for rows that
    /// break the path shape invariants.
    fn to_path(&self, anchor: &str, row: TraversalRow, max_depth: usize) -> Result<Option<RelationshipPath>, RetrievalError> {
        if row.hops.is_empty() {
            return Ok(None);
        }
        if row.hops.len() > max_depth {
            debug!("Dropping {}-hop path from {} (max_depth={})", row.hops.len(), anchor, max_depth);
            return Ok(None);
        }
        if let Some(hop) = row
            .hops
            .iter()
            .find(|h| self.excluded_edge_types.iter().any(|t| *t == h.rel_type))
        {
            warn!("Store returned excluded edge type {} from {}, dropping path", hop.rel_type, anchor);
            return Ok(None);
        }

        if row.source != anchor {
            return Err(RetrievalError::Traversal(format!(
                "path source {} does not match anchor {}",
                row.source, anchor
            )));
        }
        if row.nodes.len() != row.hops.len() + 1 || row.nodes[0].id != row.source {
            return Err(RetrievalError::Traversal(format!(
                "malformed path from {}: {} hops, {} nodes",
                anchor,
                row.hops.len(),
                row.nodes.len()
            )));
        }

        let relationships = row
            .hops
            .iter()
            .map(|hop| RelationshipDescriptor {
                rel_type: hop.rel_type.clone(),
                direction: Direction::tag(&hop.start, &hop.end, &row.source),
            })
            .collect();

        Ok(Some(RelationshipPath {
            source: row.source,
            source_text: row.source_text,
            relationships,
            path_nodes: row.nodes,
        }))
    }
}
