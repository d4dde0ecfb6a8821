//! Per-dimension affine 8-bit scalar quantization.
//!
//! Training derives `[min, max]` bounds for every dimension from a set of
//! vectors. Encoding maps each component linearly onto `0..=255`; a
//! degenerate dimension (zero range) always encodes to `0` and decodes to
//! its minimum. Inputs outside the trained bounds saturate at the cast.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A trained-or-untrained per-dimension quantizer.
///
/// Untrained until [`train`](Self::train) sees a non-empty training set;
/// encode and decode fail before that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarQuantizer {
    dim: usize,
    mins: Vec<f32>,
    maxs: Vec<f32>,
}

impl ScalarQuantizer {
    /// Create an untrained quantizer for vectors of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            mins: Vec::new(),
            maxs: Vec::new(),
        }
    }

    /// Rebuild a quantizer from persisted bounds. Empty bounds yield an
    /// untrained quantizer.
    pub(crate) fn from_bounds(mins: Vec<f32>, maxs: Vec<f32>) -> Self {
        let dim = mins.len();
        Self { dim, mins, maxs }
    }

    /// Reset the declared dimension of an untrained quantizer (used when
    /// the dimension only becomes known later in a load).
    pub(crate) fn set_dimension(&mut self, dim: usize) {
        self.dim = dim;
    }

    /// The vector dimension this quantizer operates on.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// `true` once bounds have been learned.
    pub fn is_trained(&self) -> bool {
        !self.mins.is_empty()
    }

    /// Trained per-dimension minima. Empty while untrained.
    pub(crate) fn mins(&self) -> &[f32] {
        &self.mins
    }

    /// Trained per-dimension maxima. Empty while untrained.
    pub(crate) fn maxs(&self) -> &[f32] {
        &self.maxs
    }

    /// Learn component-wise bounds from a training set. An empty set is a
    /// no-op and leaves the quantizer untrained.
    pub fn train(&mut self, training_data: &[Vec<f32>]) {
        if training_data.is_empty() {
            return;
        }
        let mut mins = training_data[0].clone();
        let mut maxs = training_data[0].clone();
        for vector in &training_data[1..] {
            for (i, &component) in vector.iter().enumerate() {
                if component < mins[i] {
                    mins[i] = component;
                }
                if component > maxs[i] {
                    maxs[i] = component;
                }
            }
        }
        self.mins = mins;
        self.maxs = maxs;
    }

    /// Encode a float vector to one byte per dimension.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u8>> {
        if !self.is_trained() {
            return Err(Error::QuantizerNotTrained);
        }
        let mut encoded = Vec::with_capacity(self.mins.len());
        for (i, &component) in vector.iter().enumerate() {
            let range = self.maxs[i] - self.mins[i];
            let byte = if range == 0.0 {
                0
            } else {
                (((component - self.mins[i]) / range) * 255.0).round() as u8
            };
            encoded.push(byte);
        }
        Ok(encoded)
    }

    /// Decode an encoded vector back to floats. Lossy.
    pub fn decode(&self, encoded: &[u8]) -> Result<Vec<f32>> {
        if !self.is_trained() {
            return Err(Error::QuantizerNotTrained);
        }
        let mut decoded = Vec::with_capacity(self.mins.len());
        for (i, &byte) in encoded.iter().enumerate() {
            let range = self.maxs[i] - self.mins[i];
            let component = if range == 0.0 {
                self.mins[i]
            } else {
                self.mins[i] + (byte as f32 / 255.0) * range
            };
            decoded.push(component);
        }
        Ok(decoded)
    }

    /// Squared L2 distance between a float query and an encoded stored
    /// vector, decoded component by component.
    ///
    /// This is the only metric the quantized path supports: once trained,
    /// the index routes every node distance through here and the declared
    /// metric is not consulted.
    #[allow(clippy::needless_range_loop)]
    pub fn distance(&self, query: &[f32], encoded: &[u8]) -> f32 {
        debug_assert!(self.is_trained());
        let mut sum = 0.0f32;
        for i in 0..query.len() {
            let range = self.maxs[i] - self.mins[i];
            let decoded = if range == 0.0 {
                self.mins[i]
            } else {
                self.mins[i] + (encoded[i] as f32 / 255.0) * range
            };
            let diff = query[i] - decoded;
            sum += diff * diff;
        }
        sum
    }
}
