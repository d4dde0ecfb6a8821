//! Generation-stamped visited set for graph traversal.
//!
//! Node ids are dense, so membership is a single array index instead of a
//! hash lookup. Clearing bumps a generation counter rather than zeroing
//! the array; a full memset happens only when the counter wraps.

/// Visited-node tracker backed by a generation-stamped array.
#[derive(Debug)]
pub struct VisitedSet {
    stamps: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    /// Create a set covering node ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0u16; capacity],
            generation: 1,
        }
    }

    /// Forget all visited nodes. Amortized O(1); the backing array is only
    /// rewritten when the generation counter wraps around.
    pub fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.stamps.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Mark `id` visited. Returns `true` iff it had not been visited since
    /// the last [`clear`](Self::clear).
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let slot = &mut self.stamps[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}
