//! Storage layer: vector store, database façade, and disk persistence.
//!
//! Data lives wholly in memory. Durability is a single binary snapshot
//! file written and read by the persistence module; there is no
//! journaling and no background I/O.

/// Database façade: read-only gating, operation routing, rebuilds.
pub mod database;
/// Single-file binary snapshot save/load.
pub mod persistence;
/// Raw vector, metadata, and encoded-vector store.
pub mod vectors;

pub use database::{Database, DatabaseOptions};
pub use vectors::VectorStorage;
