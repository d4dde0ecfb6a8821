//! Database façade over the HNSW index.
//!
//! Routes inserts, updates, deletes, and queries; enforces the read-only
//! mode; drives quantizer training and full rebuilds; and owns the
//! snapshot path for save and load.

use crate::config;
use crate::error::{Error, Result};
use crate::hnsw::{DistanceMetric, Hnsw, HnswConfig};
use crate::quantization::ScalarQuantizer;
use crate::record::{Include, Metadata, QueryResult, SyncMode};
use crate::storage::persistence;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Construction options for [`Database::open`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseOptions {
    /// Maximum neighbors per node per layer.
    pub m: usize,
    /// Candidate list width during construction.
    pub ef_construction: usize,
    /// Candidate list width during search.
    pub ef_search: usize,
    /// Distance metric for the index.
    pub metric: DistanceMetric,
    /// Open in read-only mode and load the snapshot immediately.
    pub read_only: bool,
    /// Attach an (untrained) scalar quantizer to the index.
    pub sq_enabled: bool,
    /// Reserved for a future block cache. Accepted but currently unused.
    pub cache_size_mb: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            m: config::DEFAULT_M,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            metric: DistanceMetric::L2,
            read_only: false,
            sq_enabled: false,
            cache_size_mb: 0,
        }
    }
}

/// Single-owner vector database: an HNSW index plus a snapshot path.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    hnsw: Hnsw,
    read_only: bool,
    /// Reserved for a future block cache; has no effect.
    #[allow(dead_code)]
    cache_size_mb: usize,
}

impl Database {
    /// Open a database backed by the snapshot file at `path` for vectors
    /// of the given dimension.
    ///
    /// A read-only database loads the snapshot immediately; a missing
    /// file leaves it empty. With `sq_enabled` an untrained quantizer is
    /// wired into the index.
    pub fn open<P: Into<PathBuf>>(
        path: P,
        dimension: usize,
        options: DatabaseOptions,
    ) -> Result<Self> {
        let hnsw_config = HnswConfig {
            m: options.m,
            ef_construction: options.ef_construction,
            ef_search: options.ef_search,
            metric: options.metric,
        };
        let quantizer = options
            .sq_enabled
            .then(|| ScalarQuantizer::new(dimension));
        let mut database = Self {
            path: path.into(),
            hnsw: Hnsw::new(dimension, hnsw_config, quantizer),
            read_only: options.read_only,
            cache_size_mb: options.cache_size_mb,
        };
        if options.read_only {
            database.load()?;
        }
        Ok(database)
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyViolation);
        }
        Ok(())
    }

    /// `true` when opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Total number of records, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.hnsw.len()
    }

    /// `true` when no records have ever been inserted (or survived a
    /// rebuild).
    pub fn is_empty(&self) -> bool {
        self.hnsw.is_empty()
    }

    /// Borrow the underlying index.
    pub fn index(&self) -> &Hnsw {
        &self.hnsw
    }

    /// Insert a vector with metadata and return its assigned id.
    pub fn insert(&mut self, vector: Vec<f32>, metadata: Metadata) -> Result<u32> {
        self.check_writable()?;
        self.hnsw.insert(vector, metadata)
    }

    /// Replace a record: tombstone `id`, insert the new vector, and
    /// return the **new** id. Callers must adopt the returned id.
    pub fn update(&mut self, id: u32, vector: Vec<f32>, metadata: Metadata) -> Result<u32> {
        self.check_writable()?;
        self.hnsw.mark_deleted(id);
        self.hnsw.insert(vector, metadata)
    }

    /// Tombstone a record. Returns `false` for unknown ids. The record
    /// stays in storage until the next rebuild.
    pub fn delete_vector(&mut self, id: u32) -> Result<bool> {
        self.check_writable()?;
        Ok(self.hnsw.mark_deleted(id))
    }

    /// Return the `k` approximately nearest live records.
    pub fn query(&self, query: &[f32], k: usize, include: &[Include]) -> Vec<QueryResult> {
        self.hnsw.k_nearest_neighbors(query, k, include)
    }

    /// Like [`query`](Self::query), restricted to records whose metadata
    /// satisfies `filter`.
    pub fn query_filtered<F: Fn(&Metadata) -> bool>(
        &self,
        query: &[f32],
        k: usize,
        filter: &F,
        include: &[Include],
    ) -> Vec<QueryResult> {
        self.hnsw
            .k_nearest_neighbors_filtered(query, k, filter, include)
    }

    /// Train the attached quantizer on every stored vector (tombstoned
    /// records included) and re-encode storage. No-op when quantization
    /// is disabled. Permitted in read-only mode: it mutates only the
    /// derived encodings, never the records or the graph.
    pub fn train_quantizer(&mut self) -> Result<()> {
        self.hnsw.train_quantizer()
    }

    /// Rebuild the index from scratch, dropping tombstoned records and
    /// compacting ids: the k-th surviving record receives id k.
    ///
    /// Trains the quantizer first when one is attached, so the rebuilt
    /// graph is constructed under quantized distances. This is the only
    /// operation that reclaims space from tombstones.
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.check_writable()?;
        self.hnsw.train_quantizer()?;

        let hnsw_config = self.hnsw.config().clone();
        let dimension = self.hnsw.dimension();
        let quantizer = self.hnsw.take_quantizer();
        let reclaimed = self.hnsw.deleted().len();

        let mut rebuilt = Hnsw::new(dimension, hnsw_config, quantizer);
        for id in 0..self.hnsw.storage().len() {
            if self.hnsw.is_deleted(id as u32) {
                continue;
            }
            let vector = self.hnsw.storage().vector(id).to_vec();
            let metadata = self.hnsw.storage().metadata(id).clone();
            rebuilt.insert(vector, metadata)?;
        }

        tracing::info!(
            "rebuilt index: {} live records, {} tombstones reclaimed",
            rebuilt.len(),
            reclaimed
        );
        self.hnsw = rebuilt;
        Ok(())
    }

    /// Write the index to the snapshot file.
    ///
    /// `SyncMode::Full` flushes and requests an OS-level sync; the other
    /// modes make no durability claim.
    pub fn save(&self, sync_mode: SyncMode) -> Result<()> {
        self.check_writable()?;
        persistence::save_index(&self.path, &self.hnsw, sync_mode)
    }

    /// Replace the in-memory index with the snapshot's contents. A
    /// missing file leaves the current (empty) state in place.
    pub fn load(&mut self) -> Result<()> {
        match persistence::load_index(&self.path)? {
            Some(index) => {
                self.hnsw = index;
                Ok(())
            }
            None => {
                tracing::warn!("no snapshot at {}; starting empty", self.path.display());
                Ok(())
            }
        }
    }
}
