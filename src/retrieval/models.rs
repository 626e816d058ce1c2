

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::db::store::{NodeId, PathNode};


/// An extracted entity mention resolved to its nearest graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityMapping {
    pub original: String,
    pub id: NodeId,
    /// Similarity in the node index's native scale; not normalised.
    pub score: f64,
}


/// Orientation of one hop relative to the path's anchor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Undirected,
}

impl Direction {

    /// `Outgoing` when the hop leaves the anchor, `Incoming` when it enters it,
    /// `Undirected` for hops further along the path. A self-loop on the anchor
    /// counts as outgoing.
    #[must_use]
    pub fn tag(start: &str, end: &str, anchor: &str) -> Self {
        if start == anchor {
            Self::Outgoing
        } else if end == anchor {
            Self::Incoming
        } else {
            Self::Undirected
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub direction: Direction,
}


/// One traversal result: `path_nodes` has one more entry than `relationships`
/// and starts at `source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipPath {
    pub source: NodeId,
    pub source_text: String,
    pub relationships: Vec<RelationshipDescriptor>,
    pub path_nodes: Vec<PathNode>,
}


#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphContextMetadata {
    pub num_entities: usize,
    pub num_paths: usize,
    pub max_depth: usize,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEvidence {
    pub query: String,
    pub entities: Vec<EntityMapping>,
    pub relationships: Vec<RelationshipPath>,
    pub metadata: GraphContextMetadata,
}


/// Outcome of the graph branch for one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GraphContext {
    Found(GraphEvidence),
    Failed { error: String },
}

impl GraphContext {

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }


    pub fn relationships(&self) -> &[RelationshipPath] {
        match self {
            Self::Found(evidence) => &evidence.relationships,
            Self::Failed { .. } => &[],
        }
    }
}


#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub positions: Vec<i64>,
    pub pages: Vec<i64>,
}


/// Leading chunks of one source document, parallel-indexed with their metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    pub filename: String,
    pub chunk_text: Vec<String>,
    pub metadata: ChunkMetadata,
}


/// Final evidence text handed to the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeContext(String);

impl CompositeContext {

    pub fn empty() -> Self {
        Self::default()
    }


    pub fn as_str(&self) -> &str {
        &self.0
    }


    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }


    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for CompositeContext {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CompositeContext {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for CompositeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
