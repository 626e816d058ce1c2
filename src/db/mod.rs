

pub mod client;
pub mod helix_store;
pub mod memory;
pub mod store;

pub use client::{HelixClient, HelixClientError};
pub use helix_store::HelixChunkSearcher;
pub use memory::{InMemoryChunkSearcher, InMemoryGraph};
pub use store::{
    ChunkHit, ChunkSearchParams, ChunkSearcher, ChunkStore, GraphStore, NodeId, NodeIndex, NodeMatch, PathNode,
    StoreError, StoredChunk, TraversalHop, TraversalRequest, TraversalRow,
};
