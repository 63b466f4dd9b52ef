//! # Brute-force Layer
//!
//! An unindexed holder registry. Every query tests every live member with
//! the holder's own predicates, fanned out over a rayon pool. There is no
//! cache, so there is nothing to go stale; the price is O(members) per query.
//!
//! The member set is snapshotted under the shared lock and the lock is
//! released before the scan, so membership changes never wait on a scan.
//! A holder can belong to many layers; none of them owns it.

mod config;

use std::fmt;
use std::sync::Arc;

use hashbrown::HashSet;
use parking_lot::RwLock;
use rayon::ThreadPool;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::Result;
use crate::model::{Holder, HolderRef, HolderSet, Predicate, Tagged, WeakRef};

pub use config::LayerConfig;

/// Unindexed set of holders answering queries by parallel scan.
pub struct Layer<H: Tagged = Holder> {
    holders: RwLock<HashSet<WeakRef<H>>>,
    /// Dedicated scan pool; `None` runs on rayon's global pool.
    pool: Option<Arc<ThreadPool>>,
    sequential_threshold: usize,
}

impl<H: Tagged> Layer<H> {
    pub fn new() -> Self {
        Self::from_parts(None, LayerConfig::default().sequential_threshold)
    }

    /// Scan on a pool owned by the embedding application.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self::from_parts(Some(pool), LayerConfig::default().sequential_threshold)
    }

    pub fn with_config(config: &LayerConfig) -> Result<Self> {
        let pool = config.build_pool()?.map(Arc::new);
        Ok(Self::from_parts(pool, config.sequential_threshold))
    }

    fn from_parts(pool: Option<Arc<ThreadPool>>, sequential_threshold: usize) -> Self {
        Self {
            holders: RwLock::new(HashSet::new()),
            pool,
            sequential_threshold,
        }
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Returns true if the holder wasn't a member yet.
    pub fn add_holder(&self, holder: &HolderRef<H>) -> bool {
        self.holders.write().insert(holder.downgrade())
    }

    pub fn add_holders<'a, I>(&self, holders: I)
    where
        I: IntoIterator<Item = &'a HolderRef<H>>,
        H: 'a,
    {
        let keys: SmallVec<[WeakRef<H>; 8]> = holders.into_iter().map(HolderRef::downgrade).collect();
        self.holders.write().extend(keys);
    }

    /// Returns true if the holder was a member.
    pub fn remove_holder(&self, holder: &HolderRef<H>) -> bool {
        self.holders.write().remove(&holder.downgrade())
    }

    /// Returns how many of the given holders were members.
    pub fn remove_holders<'a, I>(&self, holders: I) -> usize
    where
        I: IntoIterator<Item = &'a HolderRef<H>>,
        H: 'a,
    {
        let keys: SmallVec<[WeakRef<H>; 8]> = holders.into_iter().map(HolderRef::downgrade).collect();
        let mut members = self.holders.write();
        keys.iter().filter(|key| members.remove(*key)).count()
    }

    pub fn contains(&self, holder: &HolderRef<H>) -> bool {
        self.holders.read().contains(&holder.downgrade())
    }

    /// Number of members, including dropped ones not yet pruned.
    pub fn len(&self) -> usize {
        self.holders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.read().is_empty()
    }

    pub fn clear(&self) {
        self.holders.write().clear();
    }

    /// Forget members whose owner has dropped them. Returns how many.
    pub fn prune(&self) -> usize {
        let mut members = self.holders.write();
        let before = members.len();
        members.retain(|key| key.is_alive());
        let pruned = before - members.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned dropped layer members");
        }
        pruned
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Members that carry `name`.
    pub fn filter(&self, name: &str) -> HolderSet<H> {
        self.scan(|h| h.holder().has_tag(name))
    }

    /// Members carrying every tag in `with` and none in `without`.
    pub fn filter_tags<W, X, S, T>(&self, with: W, without: X) -> HolderSet<H>
    where
        W: IntoIterator<Item = S>,
        S: AsRef<str>,
        X: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let with: SmallVec<[String; 4]> =
            with.into_iter().map(|s| s.as_ref().to_owned()).collect();
        let without: SmallVec<[String; 4]> =
            without.into_iter().map(|s| s.as_ref().to_owned()).collect();
        self.scan(|h| h.holder().has_all_tags(&with) && !h.holder().has_any_tag(&without))
    }

    /// Members for which `predicate` holds. `None` matches nothing.
    pub fn filter_by(&self, predicate: Option<&Predicate<H>>) -> HolderSet<H> {
        match predicate {
            Some(predicate) => self.scan(predicate),
            None => HolderSet::new(),
        }
    }

    /// Members for which `predicate` holds. The predicate runs concurrently
    /// on the scan pool.
    pub fn filter_where<F>(&self, predicate: F) -> HolderSet<H>
    where
        F: Fn(&H) -> bool + Sync,
    {
        self.scan(predicate)
    }

    fn snapshot(&self) -> Vec<HolderRef<H>> {
        self.holders
            .read()
            .iter()
            .filter_map(WeakRef::upgrade)
            .collect()
    }

    /// Test every live member, in parallel once the layer is large enough.
    fn scan<F>(&self, test: F) -> HolderSet<H>
    where
        F: Fn(&H) -> bool + Sync,
    {
        let members = self.snapshot();
        if members.len() < self.sequential_threshold {
            return members.into_iter().filter(|h| test(&**h)).collect();
        }

        let run = || -> Vec<HolderRef<H>> {
            members
                .par_iter()
                .filter(|h| test(&***h))
                .cloned()
                .collect()
        };
        let matched = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        tracing::trace!(members = members.len(), matched = matched.len(), "layer scan");
        matched.into_iter().collect()
    }
}

impl<H: Tagged> Default for Layer<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Tagged> fmt::Debug for Layer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("holders", &self.holders.read().len())
            .field("dedicated_pool", &self.pool.is_some())
            .field("sequential_threshold", &self.sequential_threshold)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
