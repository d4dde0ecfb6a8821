//! HNSW insertion.
//!
//! A new node is appended to storage, assigned a random level, then
//! linked layer by layer: a greedy descent finds the neighborhood, the
//! closest `M` candidates per layer become neighbors, and back-links that
//! push a neighbor over capacity evict whichever of its neighbors lies
//! farthest from the neighbor's own vector.

use crate::error::Result;
use crate::hnsw::graph::{Hnsw, Node};
use crate::hnsw::visited::VisitedSet;
use crate::record::Metadata;

impl Hnsw {
    /// Insert a vector with its metadata. Returns the assigned node id,
    /// which equals the storage length before the call.
    ///
    /// Fails with `DimensionMismatch` before any state changes, so a
    /// failed insert is invisible to subsequent reads.
    pub fn insert(&mut self, vector: Vec<f32>, metadata: Metadata) -> Result<u32> {
        let new_id = self.storage.len() as u32;
        self.storage.push(vector, metadata, self.quantizer.as_ref())?;

        let new_layer = self.random_level();
        self.nodes.push(Node::new(new_id, new_layer));

        let Some(entry_point) = self.entry_point else {
            self.entry_point = Some(new_id);
            return Ok(new_id);
        };

        let query = self.storage.vector(new_id as usize).to_vec();
        let top = self.nodes[entry_point as usize].max_layer;
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut current = entry_point;

        // Greedy descent through the layers above the new node's level.
        for layer in ((new_layer + 1)..=top).rev() {
            let found = self.search_layer(&query, current, 1, layer, &mut visited, &accept_all);
            match found.first() {
                Some(&nearest) => current = nearest,
                None => break,
            }
        }

        // Link on every layer the new node shares with the graph.
        for layer in (0..=new_layer.min(top)).rev() {
            let found = self.search_layer(
                &query,
                current,
                self.config.ef_construction,
                layer,
                &mut visited,
                &accept_all,
            );
            if found.is_empty() {
                continue;
            }

            let chosen: Vec<u32> = found.iter().take(self.config.m).copied().collect();
            for &neighbor_id in &chosen {
                self.nodes[new_id as usize].neighbors[layer].push(neighbor_id);
                self.nodes[neighbor_id as usize].neighbors[layer].push(new_id);
                if self.nodes[neighbor_id as usize].neighbors[layer].len() > self.config.m {
                    self.evict_farthest_neighbor(neighbor_id, layer);
                }
            }
            current = found[0];
        }

        if new_layer > top {
            self.entry_point = Some(new_id);
        }
        Ok(new_id)
    }

    /// Drop the neighbor of `node_id` at `layer` that lies farthest from
    /// `node_id`'s own vector. The reference point is the neighbor being
    /// pruned, not the newly inserted node.
    fn evict_farthest_neighbor(&mut self, node_id: u32, layer: usize) {
        let base = self.storage.vector(node_id as usize).to_vec();
        let mut farthest: Option<(usize, f32)> = None;
        for (position, &candidate) in self.nodes[node_id as usize].neighbors[layer]
            .iter()
            .enumerate()
        {
            let distance = self.node_distance(&base, candidate);
            if farthest.map_or(true, |(_, worst)| distance > worst) {
                farthest = Some((position, distance));
            }
        }
        if let Some((position, _)) = farthest {
            self.nodes[node_id as usize].neighbors[layer].remove(position);
        }
    }
}
