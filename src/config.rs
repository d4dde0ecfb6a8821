//! Default tuning parameters for index construction and search.
//!
//! These are compile-time constants; per-index values are carried by
//! [`HnswConfig`](crate::hnsw::HnswConfig) and
//! [`DatabaseOptions`](crate::storage::DatabaseOptions), whose `Default`
//! impls read from here.

/// Default maximum number of neighbors per node per layer.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64.
pub const DEFAULT_M: usize = 16;

/// Default candidate-list width during index construction.
///
/// Controls the size of the dynamic candidate list while linking a new
/// node. Higher values produce a better graph but slow down insertion.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default candidate-list width during search.
///
/// Controls the size of the dynamic candidate list at query time.
/// Higher values improve recall at the cost of latency. Queries always
/// search with at least `k` candidates regardless of this setting.
pub const DEFAULT_EF_SEARCH: usize = 50;
