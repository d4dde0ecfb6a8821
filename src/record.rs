//! Record types shared across the index: metadata, query results, and
//! persistence sync modes.
//!
//! Metadata is an ordered string map so that snapshots of the same state
//! are byte-identical regardless of insertion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-vector metadata: string keys mapped to string values.
///
/// Keys are unique within a record. The ordered map keeps persistence
/// deterministic; ordering carries no semantic meaning.
pub type Metadata = BTreeMap<String, String>;

/// Selects which fields a [`QueryResult`] carries back from a query.
///
/// Fields not named in the include set are left at their defaults, which
/// keeps result materialization cheap when callers only want ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Include {
    /// The node id. Always populated regardless of the include set.
    Id,
    /// Distance from the query vector, recomputed on demand.
    Distance,
    /// A clone of the record's metadata map.
    Metadata,
    /// A clone of the stored vector.
    Vector,
}

/// A single query hit.
///
/// `id` is always set. `distance` stays `0.0`, and `metadata`/`vector`
/// stay empty, unless the corresponding [`Include`] was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Dense node id of the matched vector.
    pub id: u32,
    /// Distance under the index metric (smaller is closer).
    pub distance: f32,
    /// The record's metadata, when requested.
    pub metadata: Metadata,
    /// The stored vector, when requested.
    pub vector: Vec<f32>,
}

/// How eagerly `save` pushes bytes toward the disk.
///
/// Only `Full` makes a durability claim: it flushes the userspace buffer
/// and requests an OS-level sync before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Flush and fsync before returning.
    #[default]
    Full,
    /// Write without an explicit flush to stable storage.
    Normal,
    /// Write without any flush request.
    Off,
}
