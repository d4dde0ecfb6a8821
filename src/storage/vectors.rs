//! Vector-and-metadata store backing the HNSW graph.
//!
//! Three parallel arrays: raw vectors, metadata maps, and (when a trained
//! quantizer is attached to the index) encoded vectors. The `i`-th entries
//! correspond to node id `i`.

use crate::error::{Error, Result};
use crate::quantization::ScalarQuantizer;
use crate::record::Metadata;

/// Append-only store of fixed-dimension vectors with attached metadata.
#[derive(Debug, Default)]
pub struct VectorStorage {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<Metadata>,
    encoded: Vec<Vec<u8>>,
}

impl VectorStorage {
    /// Create an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            metadata: Vec::new(),
            encoded: Vec::new(),
        }
    }

    /// Append a vector and its metadata.
    ///
    /// When a trained quantizer is supplied, the encoding is appended in
    /// parallel. Encoding happens before any array is touched, so an
    /// error leaves the store unchanged.
    pub fn push(
        &mut self,
        vector: Vec<f32>,
        metadata: Metadata,
        quantizer: Option<&ScalarQuantizer>,
    ) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let encoded = match quantizer {
            Some(quantizer) if quantizer.is_trained() => Some(quantizer.encode(&vector)?),
            _ => None,
        };
        self.vectors.push(vector);
        self.metadata.push(metadata);
        if let Some(encoded) = encoded {
            self.encoded.push(encoded);
        }
        Ok(())
    }

    /// Re-encode every stored vector with a freshly trained quantizer.
    /// No-op while the quantizer is untrained.
    pub fn encode_all(&mut self, quantizer: &ScalarQuantizer) -> Result<()> {
        if !quantizer.is_trained() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(self.vectors.len());
        for vector in &self.vectors {
            encoded.push(quantizer.encode(vector)?);
        }
        self.encoded = encoded;
        Ok(())
    }

    /// The stored vector at `index`.
    pub fn vector(&self, index: usize) -> &[f32] {
        &self.vectors[index]
    }

    /// The metadata at `index`.
    pub fn metadata(&self, index: usize) -> &Metadata {
        &self.metadata[index]
    }

    /// The encoded vector at `index`. Valid only after encoding.
    pub(crate) fn encoded(&self, index: usize) -> &[u8] {
        &self.encoded[index]
    }

    /// All stored vectors, in id order.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// `true` when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The fixed vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of encoded vectors currently held.
    pub(crate) fn encoded_len(&self) -> usize {
        self.encoded.len()
    }
}
