

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::models::EntityMapping;
use crate::core::error::RetrievalError;
use crate::db::store::NodeIndex;
use crate::llm::embeddings::Embedder;
use crate::llm::extractor::EntityExtractor;
use crate::utils::with_deadline;


/// Entities extracted from one query and the subset that resolved to nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub extracted: Vec<String>,
    pub mappings: Vec<EntityMapping>,
    pub correction_context: Option<String>,
}


/// Maps entity mentions in a query to graph nodes by top-1 embedding similarity.
///
/// Extraction failure fails the whole query. A mention with no neighbour, or
/// one below the optional score floor, is dropped without error; callers
/// receive partial resolutions by design.
pub struct EntityResolver {
    extractor: Arc<dyn EntityExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn NodeIndex>,
    min_score: Option<f64>,
    deadline: Option<Duration>,
}

impl EntityResolver {

    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn NodeIndex>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            min_score: None,
            deadline: None,
        }
    }


    #[must_use]
    pub fn with_min_score(mut self, min_score: Option<f64>) -> Self {
        self.min_score = min_score;
        self
    }


    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }


    pub async fn resolve(&self, query: &str) -> Result<Vec<EntityMapping>, RetrievalError> {
        Ok(self.resolve_detailed(query).await?.mappings)
    }


    pub async fn resolve_detailed(&self, query: &str) -> Result<Resolution, RetrievalError> {
        let extraction = with_deadline(
            self.deadline,
            async {
                self.extractor
                    .extract(query)
                    .await
                    .map_err(|e| RetrievalError::Extraction(e.to_string()))
            },
            |limit| RetrievalError::Extraction(format!("extractor timed out after {}ms", limit.as_millis())),
        )
        .await?;

        if extraction.is_failure() {
            return Err(RetrievalError::Extraction(
                "Failed to extract entities from query".to_string(),
            ));
        }

        let mut mappings = Vec::with_capacity(extraction.entities.len());

        for entity in &extraction.entities {
            let embedding = with_deadline(
                self.deadline,
                async {
                    self.embedder
                        .embed(entity)
                        .await
                        .map_err(|e| RetrievalError::Embedding(format!("{}: {}", entity, e)))
                },
                |limit| RetrievalError::Embedding(format!("{}: timed out after {}ms", entity, limit.as_millis())),
            )
            .await?;

            let closest = with_deadline(
                self.deadline,
                async {
                    self.index
                        .nearest(&embedding, 1)
                        .await
                        .map_err(|e| RetrievalError::Traversal(e.to_string()))
                },
                |limit| RetrievalError::Traversal(format!("node index timed out after {}ms", limit.as_millis())),
            )
            .await?;

            let Some(node) = closest.into_iter().next() else {
                debug!("No node matched entity '{}', dropping", entity);
                continue;
            };

            if let Some(floor) = self.min_score {
                if node.score < floor {
                    debug!(
                        "Entity '{}' best match {} scored {:.3} < {:.3}, dropping",
                        entity, node.id, node.score, floor
                    );
                    continue;
                }
            }

            debug!("Resolved '{}' -> {} (score={:.3})", entity, node.id, node.score);
            mappings.push(EntityMapping {
                original: entity.clone(),
                id: node.id,
                score: node.score,
            });
        }

        info!(
            "Resolved {}/{} entities for query: {}",
            mappings.len(),
            extraction.entities.len(),
            crate::preview(query, 50)
        );

        Ok(Resolution {
            extracted: extraction.entities,
            mappings,
            correction_context: extraction.correction_context,
        })
    }
}
