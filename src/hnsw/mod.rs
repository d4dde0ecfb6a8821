//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! A layered proximity graph over dense node ids. Higher layers are
//! exponentially sparser and serve to zoom the search toward the query's
//! neighborhood before the widest search runs at layer 0. Deletions are
//! soft: tombstoned nodes stay in storage and in adjacency lists but are
//! never returned from queries. When a trained scalar quantizer is
//! attached, every node distance is evaluated through it.

/// Distance metrics: squared L2, cosine, and negated inner product.
pub mod distance;
/// Graph structure, configuration, level assignment, and tombstones.
pub mod graph;
/// Insertion with symmetric linking and neighbor pruning.
pub mod insert;
/// Candidate-bounded layer search and multi-layer k-NN.
pub mod search;
/// Generation-based visited set for graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use graph::{Hnsw, HnswConfig, Node};
