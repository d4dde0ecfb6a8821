//! HNSW search: candidate-bounded layer search and multi-layer k-NN.
//!
//! A metadata filter constrains which nodes are admitted to the result
//! set but never which nodes are traversed: filtered-out nodes still act
//! as hops, which keeps filtered recall from collapsing. Tombstoned
//! nodes are excluded from both roles.

use crate::hnsw::graph::Hnsw;
use crate::hnsw::visited::VisitedSet;
use crate::record::{Include, Metadata, QueryResult};
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// Frontier entry: max-heap on negated distance gives min-heap behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    neg_distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_distance.cmp(&other.neg_distance)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result entry: max-heap on distance, trimmed back to `ef` after pushes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.cmp(&other.distance)
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Hnsw {
    /// Search one layer of the graph from `entry`, keeping the best `ef`
    /// admitted nodes. Returns their ids sorted by ascending distance.
    ///
    /// `visited` is cleared on entry and reused across calls to avoid
    /// reallocating per layer.
    pub(crate) fn search_layer<F: Fn(&Metadata) -> bool>(
        &self,
        query: &[f32],
        entry: u32,
        ef: usize,
        layer: usize,
        visited: &mut VisitedSet,
        filter: &F,
    ) -> Vec<u32> {
        visited.clear();
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(ef + 1);

        let entry_distance = self.node_distance(query, entry);
        visited.insert(entry);
        if !self.is_deleted(entry) {
            candidates.push(Candidate {
                neg_distance: OrderedFloat(-entry_distance),
                id: entry,
            });
            if filter(self.storage.metadata(entry as usize)) {
                results.push(ResultEntry {
                    distance: OrderedFloat(entry_distance),
                    id: entry,
                });
            }
        }

        while let Some(current) = candidates.pop() {
            let current_distance = -current.neg_distance.0;

            // The closest unexplored candidate is already farther than the
            // worst kept result: the frontier cannot improve anything.
            if results.len() >= ef {
                if let Some(worst) = results.peek() {
                    if current_distance > worst.distance.0 {
                        break;
                    }
                }
            }

            let node = &self.nodes[current.id as usize];
            if layer > node.max_layer {
                continue;
            }

            for &neighbor_id in &node.neighbors[layer] {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                if self.is_deleted(neighbor_id) {
                    continue;
                }

                let distance = self.node_distance(query, neighbor_id);
                let admit = results.len() < ef
                    || results
                        .peek()
                        .is_some_and(|worst| distance < worst.distance.0);
                if admit {
                    candidates.push(Candidate {
                        neg_distance: OrderedFloat(-distance),
                        id: neighbor_id,
                    });
                    if filter(self.storage.metadata(neighbor_id as usize)) {
                        results.push(ResultEntry {
                            distance: OrderedFloat(distance),
                            id: neighbor_id,
                        });
                    }
                    while results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Return the `k` approximately nearest live vectors to `query`.
    ///
    /// `include` selects which [`QueryResult`] fields are populated;
    /// distance is recomputed on demand (through the quantizer when one
    /// is trained).
    pub fn k_nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        include: &[Include],
    ) -> Vec<QueryResult> {
        let accept_all = |_: &Metadata| true;
        self.k_nearest_neighbors_filtered(query, k, &accept_all, include)
    }

    /// Like [`k_nearest_neighbors`](Self::k_nearest_neighbors), restricted
    /// to records whose metadata satisfies `filter`.
    ///
    /// The filter gates result admission on every layer of the descent;
    /// rejected nodes still steer the traversal.
    pub fn k_nearest_neighbors_filtered<F: Fn(&Metadata) -> bool>(
        &self,
        query: &[f32],
        k: usize,
        filter: &F,
        include: &[Include],
    ) -> Vec<QueryResult> {
        let Some(entry_point) = self.entry_point else {
            return Vec::new();
        };

        let mut visited = VisitedSet::new(self.nodes.len());
        let mut current = entry_point;
        let top = self.nodes[entry_point as usize].max_layer;

        // Zoom toward the query with ef=1 on every layer above 0; an
        // empty layer result leaves the entry unchanged.
        for layer in (1..=top).rev() {
            let found = self.search_layer(query, current, 1, layer, &mut visited, filter);
            if let Some(&nearest) = found.first() {
                current = nearest;
            }
        }

        let ef = self.config.ef_search.max(k);
        let found = self.search_layer(query, current, ef, 0, &mut visited, filter);

        let mut hits = Vec::new();
        for id in found {
            if self.is_deleted(id) {
                continue;
            }
            if hits.len() >= k {
                break;
            }
            let mut hit = QueryResult {
                id,
                ..QueryResult::default()
            };
            if include.contains(&Include::Distance) {
                hit.distance = self.node_distance(query, id);
            }
            if include.contains(&Include::Metadata) {
                hit.metadata = self.storage.metadata(id as usize).clone();
            }
            if include.contains(&Include::Vector) {
                hit.vector = self.storage.vector(id as usize).to_vec();
            }
            hits.push(hit);
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::{HnswConfig, Node};
    use crate::record::Metadata;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Hand-assemble a layer-0 graph: five points, node 0 linked to 1, 2,
    /// and 4, each of them linked back.
    fn hand_built_graph() -> Hnsw {
        let mut index = Hnsw::new(2, HnswConfig::default(), None);
        let points: [[f32; 2]; 5] = [
            [0.0, 0.0],
            [1.0, 1.0],
            [0.1, 0.1],
            [5.0, 5.0],
            [0.2, 0.2],
        ];
        for (i, point) in points.iter().enumerate() {
            index
                .storage
                .push(point.to_vec(), Metadata::new(), None)
                .unwrap();
            index.nodes.push(Node::new(i as u32, 0));
        }
        index.nodes[0].neighbors[0] = vec![1, 2, 4];
        index.nodes[1].neighbors[0] = vec![0];
        index.nodes[2].neighbors[0] = vec![0];
        index.nodes[4].neighbors[0] = vec![0];
        index.entry_point = Some(0);
        index
    }

    #[test]
    fn test_search_layer_ef_one() {
        let index = hand_built_graph();
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(index.len());
        let found = index.search_layer(&[0.05, 0.05], 0, 1, 0, &mut visited, &accept_all);
        assert_eq!(found.len(), 1);
        assert!([0, 2, 4].contains(&found[0]));
    }

    #[test]
    fn test_search_layer_ef_three() {
        let index = hand_built_graph();
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(index.len());
        let mut found = index.search_layer(&[0.05, 0.05], 0, 3, 0, &mut visited, &accept_all);
        found.sort_unstable();
        assert_eq!(found, vec![0, 2, 4]);
    }

    #[test]
    fn test_search_layer_results_ascend_by_distance() {
        let index = hand_built_graph();
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(index.len());
        let found = index.search_layer(&[0.0, 0.0], 0, 5, 0, &mut visited, &accept_all);
        let distances: Vec<f32> = found
            .iter()
            .map(|&id| index.node_distance(&[0.0, 0.0], id))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_search_layer_skips_tombstones() {
        let mut index = hand_built_graph();
        index.deleted.insert(2);
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(index.len());
        let found = index.search_layer(&[0.05, 0.05], 0, 5, 0, &mut visited, &accept_all);
        assert!(!found.contains(&2));
    }

    #[test]
    fn test_search_layer_tombstoned_entry_yields_nothing() {
        let mut index = hand_built_graph();
        index.deleted.insert(0);
        let accept_all = |_: &Metadata| true;
        let mut visited = VisitedSet::new(index.len());
        let found = index.search_layer(&[0.05, 0.05], 0, 5, 0, &mut visited, &accept_all);
        assert!(found.is_empty());
    }

    #[test]
    fn test_knn_empty_index() {
        let index = Hnsw::new(2, HnswConfig::default(), None);
        assert!(index.k_nearest_neighbors(&[0.0, 0.0], 3, &[Include::Id]).is_empty());
    }

    #[test]
    fn test_knn_basic() {
        let mut index = Hnsw::new(2, HnswConfig::default(), None);
        let points = [
            [0.0, 0.0],
            [1.0, 1.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [10.0, 10.0],
            [10.1, 10.1],
        ];
        for point in points {
            index.insert(point.to_vec(), Metadata::new()).unwrap();
        }
        let hits = index.k_nearest_neighbors(&[0.05, 0.05], 3, &[Include::Id]);
        let mut ids: Vec<u32> = hits.iter().map(|hit| hit.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_knn_include_population() {
        let mut index = Hnsw::new(2, HnswConfig::default(), None);
        let stored_meta = meta(&[("key", "value")]);
        index.insert(vec![1.0, 2.0], stored_meta.clone()).unwrap();

        let query = [1.1, 2.1];

        let hits = index.k_nearest_neighbors(&query, 1, &[Include::Id]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits[0].metadata.is_empty());
        assert!(hits[0].vector.is_empty());

        let hits = index.k_nearest_neighbors(&query, 1, &[Include::Id, Include::Distance]);
        assert!(hits[0].distance > 0.0);
        assert!(hits[0].metadata.is_empty());

        let hits = index.k_nearest_neighbors(&query, 1, &[Include::Id, Include::Metadata]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[0].metadata, stored_meta);

        let hits = index.k_nearest_neighbors(&query, 1, &[Include::Id, Include::Vector]);
        assert_eq!(hits[0].vector, vec![1.0, 2.0]);
        assert!(hits[0].metadata.is_empty());
    }

    #[test]
    fn test_knn_filtered() {
        let mut index = Hnsw::new(2, HnswConfig::default(), None);
        index.insert(vec![0.0, 0.0], meta(&[("type", "a")])).unwrap();
        index.insert(vec![0.1, 0.1], meta(&[("type", "b")])).unwrap();
        index.insert(vec![0.2, 0.2], meta(&[("type", "a")])).unwrap();
        index.insert(vec![0.3, 0.3], meta(&[("type", "c")])).unwrap();

        let filter_a =
            |metadata: &Metadata| metadata.get("type").is_some_and(|value| value == "a");
        let hits = index.k_nearest_neighbors_filtered(&[0.0, 0.0], 2, &filter_a, &[Include::Id]);
        let mut ids: Vec<u32> = hits.iter().map(|hit| hit.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2]);

        let filter_b =
            |metadata: &Metadata| metadata.get("type").is_some_and(|value| value == "b");
        let hits = index.k_nearest_neighbors_filtered(&[0.0, 0.0], 1, &filter_b, &[Include::Id]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_knn_excludes_deleted() {
        let mut index = Hnsw::new(2, HnswConfig::default(), None);
        index.insert(vec![1.0, 1.0], Metadata::new()).unwrap();
        index.insert(vec![2.0, 2.0], Metadata::new()).unwrap();
        index.insert(vec![3.0, 3.0], Metadata::new()).unwrap();
        index.mark_deleted(1);
        let hits = index.k_nearest_neighbors(&[1.1, 1.1], 3, &[Include::Id]);
        let ids: Vec<u32> = hits.iter().map(|hit| hit.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&0));
        assert!(!ids.contains(&1));
        assert!(ids.contains(&2));
    }
}
