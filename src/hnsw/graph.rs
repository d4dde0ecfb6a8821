//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] carries the tuning parameters (M, ef_construction,
//! ef_search, distance metric). [`Hnsw`] owns the vector storage, the
//! graph nodes with per-layer adjacency, the tombstone set, the entry
//! point, and an optional scalar quantizer that takes over distance
//! evaluation once trained.

use crate::config;
use crate::error::Result;
use crate::hnsw::distance::DistanceMetric;
use crate::quantization::ScalarQuantizer;
use crate::storage::VectorStorage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Configuration parameters for an HNSW index.
///
/// Controls the trade-off between build speed, search speed, recall, and
/// memory usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum number of neighbors per node per layer.
    pub m: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size during search (higher = better recall, slower).
    pub ef_search: usize,
    /// Distance function for similarity computation.
    pub metric: DistanceMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::DEFAULT_M,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            metric: DistanceMetric::L2,
        }
    }
}

/// A node in the proximity graph.
///
/// The `i`-th node in the index corresponds to the `i`-th record in
/// storage; `id` always equals that position. Adjacency order within a
/// layer is incidental but preserved by persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Dense node id, equal to the storage index.
    pub id: u32,
    /// Highest layer this node participates in.
    pub max_layer: usize,
    /// Neighbor ids per layer, for layers `0..=max_layer`.
    pub neighbors: Vec<Vec<u32>>,
}

impl Node {
    /// Create a node with empty adjacency on layers `0..=max_layer`.
    pub fn new(id: u32, max_layer: usize) -> Self {
        Self {
            id,
            max_layer,
            neighbors: vec![Vec::new(); max_layer + 1],
        }
    }
}

/// Hierarchical navigable small world index over a [`VectorStorage`].
///
/// Deletions are soft: tombstoned nodes remain in storage and adjacency
/// but are never returned from queries. Node ids are assigned as a dense
/// counter and never reused within an instance; only a full rebuild
/// (driven by the database façade) remaps them.
#[derive(Debug)]
pub struct Hnsw {
    pub(crate) storage: VectorStorage,
    pub(crate) nodes: Vec<Node>,
    pub(crate) deleted: BTreeSet<u32>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) config: HnswConfig,
    pub(crate) quantizer: Option<ScalarQuantizer>,
    /// Level-assignment normalizer, `1 / ln(M)`.
    m_l: f64,
    rng: StdRng,
}

impl Hnsw {
    /// Create an empty index for vectors of the given dimension.
    ///
    /// When a quantizer is supplied it starts untrained: distances use the
    /// configured metric on raw vectors until training happens.
    pub fn new(dimension: usize, config: HnswConfig, quantizer: Option<ScalarQuantizer>) -> Self {
        let m_l = 1.0 / (config.m as f64).ln();
        Self {
            storage: VectorStorage::new(dimension),
            nodes: Vec::new(),
            deleted: BTreeSet::new(),
            entry_point: None,
            config,
            quantizer,
            m_l,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reassemble an index from persisted parts.
    ///
    /// The entry point is not persisted; the loaded index seeds it with
    /// the last node's id, or `None` when there are no nodes.
    pub(crate) fn from_parts(
        config: HnswConfig,
        nodes: Vec<Node>,
        storage: VectorStorage,
        deleted: BTreeSet<u32>,
        quantizer: Option<ScalarQuantizer>,
    ) -> Self {
        let m_l = 1.0 / (config.m as f64).ln();
        let entry_point = nodes.last().map(|node| node.id);
        Self {
            storage,
            nodes,
            deleted,
            entry_point,
            config,
            quantizer,
            m_l,
            rng: StdRng::from_entropy(),
        }
    }

    /// Total number of nodes, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the index holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Vector dimension this index was constructed with.
    pub fn dimension(&self) -> usize {
        self.storage.dimension()
    }

    /// The graph nodes in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The tombstoned node ids.
    pub fn deleted(&self) -> &BTreeSet<u32> {
        &self.deleted
    }

    /// The current search entry point, if any.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// The construction and search parameters.
    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// The attached quantizer, trained or not.
    pub fn quantizer(&self) -> Option<&ScalarQuantizer> {
        self.quantizer.as_ref()
    }

    /// Detach the quantizer, leaving the index without one.
    pub(crate) fn take_quantizer(&mut self) -> Option<ScalarQuantizer> {
        self.quantizer.take()
    }

    /// The underlying vector-and-metadata store.
    pub fn storage(&self) -> &VectorStorage {
        &self.storage
    }

    /// `true` if the node carries a tombstone.
    #[inline]
    pub fn is_deleted(&self, id: u32) -> bool {
        self.deleted.contains(&id)
    }

    /// Draw a layer for a new node from the exponential distribution
    /// `floor(-ln(u) * m_l)` with `u` uniform over (0, 1].
    pub(crate) fn random_level(&mut self) -> usize {
        let u: f64 = 1.0 - self.rng.gen::<f64>();
        (-u.ln() * self.m_l).floor() as usize
    }

    /// Distance from a query vector to a stored node.
    ///
    /// Routed through the quantizer (always squared L2, whatever the
    /// configured metric) once it is trained; otherwise evaluated with
    /// the configured metric on the raw stored vector.
    #[inline]
    pub(crate) fn node_distance(&self, query: &[f32], id: u32) -> f32 {
        match &self.quantizer {
            Some(quantizer) if quantizer.is_trained() => {
                quantizer.distance(query, self.storage.encoded(id as usize))
            }
            _ => self
                .config
                .metric
                .distance(query, self.storage.vector(id as usize)),
        }
    }

    /// Tombstone a node. Returns `false` for out-of-range ids.
    ///
    /// If the tombstoned node was the entry point, the entry point is
    /// reassigned to the first live node (in id order) with the greatest
    /// `max_layer`, or cleared when no live node remains. A live node
    /// whose layer later exceeds the entry point's does not take over
    /// except through insertion.
    pub fn mark_deleted(&mut self, id: u32) -> bool {
        if id as usize >= self.nodes.len() {
            return false;
        }
        self.deleted.insert(id);
        if self.entry_point == Some(id) {
            let mut new_entry = None;
            let mut top_layer = None;
            for node in &self.nodes {
                if self.deleted.contains(&node.id) {
                    continue;
                }
                if top_layer.map_or(true, |top| node.max_layer > top) {
                    top_layer = Some(node.max_layer);
                    new_entry = Some(node.id);
                }
            }
            self.entry_point = new_entry;
        }
        true
    }

    /// Train the attached quantizer on every stored vector (tombstoned
    /// records included) and re-encode storage. No-op without a quantizer
    /// or with an empty store.
    pub fn train_quantizer(&mut self) -> Result<()> {
        let Some(quantizer) = self.quantizer.as_mut() else {
            return Ok(());
        };
        quantizer.train(self.storage.vectors());
        self.storage.encode_all(quantizer)
    }
}
