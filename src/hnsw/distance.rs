//! Distance metric implementations.
//!
//! All metrics return a value where **lower is closer**, so the same
//! heap logic serves every metric. Inputs are never normalized; callers
//! pick the metric that matches their embedding space.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Distance metric used for vector similarity computation.
///
/// Dispatch is a plain enum match: the branch is predictable and each
/// kernel inlines, which matters in the graph traversal hot loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance. The square root is never taken.
    L2,
    /// Cosine distance: `1 - cosine_similarity`. Defined as `1.0` when
    /// either vector has an exactly zero norm.
    Cosine,
    /// Negated inner product: `-dot(a, b)`. The sign inversion turns
    /// "most similar" into "smallest value".
    InnerProduct,
}

impl DistanceMetric {
    /// Compute the distance between two equal-length vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_squared(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::InnerProduct => -dot_product(a, b),
        }
    }

    /// On-disk ordinal for the persistence format: L2=0, Cosine=1, IP=2.
    pub(crate) fn ordinal(self) -> i32 {
        match self {
            DistanceMetric::L2 => 0,
            DistanceMetric::Cosine => 1,
            DistanceMetric::InnerProduct => 2,
        }
    }
}

impl TryFrom<i32> for DistanceMetric {
    type Error = Error;

    fn try_from(ordinal: i32) -> Result<Self, Error> {
        match ordinal {
            0 => Ok(DistanceMetric::L2),
            1 => Ok(DistanceMetric::Cosine),
            2 => Ok(DistanceMetric::InnerProduct),
            other => Err(Error::UnknownMetric(other)),
        }
    }
}

#[inline]
fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        sum += diff * diff;
    }
    sum
}

#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

#[inline]
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
