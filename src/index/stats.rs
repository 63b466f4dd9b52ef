//! Index size counters.

use serde::{Deserialize, Serialize};

/// Point-in-time counts of an [`Index`](super::Index)'s cached state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Registered holders (forward-map entries).
    pub holders: usize,
    /// Registered holders whose owner has dropped them, not yet pruned.
    pub dead_holders: usize,
    /// Tag names with a bucket.
    pub buckets: usize,
    /// Total holder entries across all buckets, stale ones included.
    pub memberships: usize,
}
