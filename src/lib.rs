//! # embeddb
//!
//! Embeddable approximate-nearest-neighbor index over dense f32 vectors
//! with attached string key/value metadata. Search is served by a
//! hierarchical navigable small world (HNSW) proximity graph under one of
//! three distance metrics (squared Euclidean, cosine, negated inner
//! product), optionally filtered by a caller-supplied metadata predicate.
//! An optional 8-bit scalar quantizer plugs into distance evaluation for
//! reduced memory. The whole index persists to a single binary file.
//!
//! The contract is single-owner: an instance is not thread-safe and
//! requires external synchronization for any concurrent use, including
//! read-only instances. All operations are blocking and in-memory.

/// Default tuning parameters for construction and search.
pub mod config;
/// Library error types.
pub mod error;
/// HNSW approximate nearest neighbor index: graph, search, insertion, and distance metrics.
pub mod hnsw;
/// Scalar quantization: trained per-dimension f32 → u8 compression.
pub mod quantization;
/// Record types: metadata, query results, and sync modes.
pub mod record;
/// Storage layer: vector store, database façade, and disk persistence.
pub mod storage;

pub use error::{Error, Result};
pub use hnsw::{DistanceMetric, Hnsw, HnswConfig};
pub use quantization::ScalarQuantizer;
pub use record::{Include, Metadata, QueryResult, SyncMode};
pub use storage::{Database, DatabaseOptions, VectorStorage};
