//! Scalar quantization for memory-efficient vector storage.
//!
//! Compresses f32 vectors to one byte per dimension using bounds learned
//! from a training set. Once trained and wired into the index, the
//! quantizer takes over distance evaluation entirely.

/// Per-dimension affine 8-bit quantizer.
pub mod scalar;

pub use scalar::ScalarQuantizer;
