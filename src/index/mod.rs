//! # Tag Index
//!
//! A holder registry that caches a reverse mapping (tag name → holders) so a
//! single-tag query touches only the holders that were registered with that
//! tag, instead of scanning every holder.
//!
//! ## Consistency
//!
//! Holders are never told about the index, so the cache can go stale:
//!
//! - A holder that **loses** a tag after registration stays in that tag's
//!   bucket until the next query on the bucket re-validates it against the
//!   live holder and evicts it. Queries never return it.
//! - A holder that **gains** a tag after registration is invisible to queries
//!   on that tag until it is registered again.
//! - A holder that is **dropped** without being unregistered is detected by a
//!   failed upgrade and evicted the same way; `prune()` sweeps all of them.
//! - A bucket entry whose holder has no forward entry (unregistered after a
//!   re-registration changed its tag set) is an orphan: queries evict it and
//!   never return it, `prune()` sweeps them all.
//!
//! ## Locking
//!
//! One `RwLock` guards both maps, so there is no acquisition order between
//! them to get wrong. Holder locks are only ever taken *inside* the index
//! lock, never the other way round, and `register` reads the holder's tag
//! snapshot before taking the index lock at all.

mod stats;

use std::any::Any;
use std::fmt;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::{Holder, HolderRef, HolderSet, Tagged, WeakRef};

pub use stats::IndexStats;

/// Reverse-mapped registry of holders.
pub struct Index<H: Tagged = Holder> {
    maps: RwLock<IndexMaps<H>>,
}

struct IndexMaps<H> {
    /// tag name → holders believed to carry it (a cache, not authoritative)
    reverse: HashMap<String, HashSet<WeakRef<H>>>,
    /// holder → tag names seen at its last registration
    forward: HashMap<WeakRef<H>, HashSet<String>>,
}

impl<H> IndexMaps<H> {
    fn new() -> Self {
        Self {
            reverse: HashMap::new(),
            forward: HashMap::new(),
        }
    }

    /// Drop `key` from `bucket`, deleting the bucket once empty.
    fn remove_from_bucket(&mut self, bucket: &str, key: &WeakRef<H>) {
        if let Some(holders) = self.reverse.get_mut(bucket) {
            holders.remove(key);
            if holders.is_empty() {
                self.reverse.remove(bucket);
            }
        }
    }

    /// Remove a holder from every bucket its forward entry names, then the
    /// forward entry itself. Returns false if it wasn't registered.
    fn detach(&mut self, key: &WeakRef<H>) -> bool {
        let Some(names) = self.forward.remove(key) else {
            return false;
        };
        for name in &names {
            self.remove_from_bucket(name, key);
        }
        true
    }
}

impl<H: Tagged> Index<H> {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(IndexMaps::new()),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Snapshot the holder's current tag names and index it under each.
    ///
    /// Registering again replaces the forward entry but leaves the holder in
    /// buckets for tags it has since lost; those are evicted by the next
    /// query on the bucket.
    pub fn register(&self, holder: &HolderRef<H>) {
        let names = holder.holder().tag_names();
        let key = holder.downgrade();

        let mut maps = self.maps.write();
        for name in &names {
            maps.reverse
                .entry(name.clone())
                .or_default()
                .insert(key.clone());
        }
        tracing::trace!(holder = ?key, tags = names.len(), "registered holder");
        maps.forward.insert(key, names);
    }

    /// Register every holder in turn.
    pub fn register_all<'a, I>(&self, holders: I)
    where
        I: IntoIterator<Item = &'a HolderRef<H>>,
        H: 'a,
    {
        for holder in holders {
            self.register(holder);
        }
    }

    /// Remove a holder from the buckets recorded at its last registration.
    /// Returns false (and does nothing) if it was never registered.
    pub fn unregister(&self, holder: &HolderRef<H>) -> bool {
        let key = holder.downgrade();
        let removed = self.maps.write().detach(&key);
        if removed {
            tracing::trace!(holder = ?key, "unregistered holder");
        }
        removed
    }

    /// Empty the whole index.
    pub fn clear(&self) {
        let mut maps = self.maps.write();
        tracing::debug!(holders = maps.forward.len(), "clearing index");
        maps.reverse.clear();
        maps.forward.clear();
    }

    /// Unregister every holder indexed under `name` and drop that bucket.
    /// Returns how many holders were removed.
    ///
    /// Those holders are also dropped from buckets their forward entry no
    /// longer names, so no orphan of theirs survives.
    pub fn clear_tag(&self, name: &str) -> usize {
        let mut maps = self.maps.write();
        let Some(bucket) = maps.reverse.remove(name) else {
            return 0;
        };
        let mut cleared = 0;
        for key in &bucket {
            if maps.detach(key) {
                cleared += 1;
            }
        }
        for holders in maps.reverse.values_mut() {
            holders.retain(|key| !bucket.contains(key));
        }
        maps.reverse.retain(|_, holders| !holders.is_empty());
        tracing::debug!(tag = name, cleared, "cleared tag bucket");
        cleared
    }

    /// Drop every holder whose owner has gone away, and every orphan bucket
    /// entry. Returns how many holders were removed from the forward map.
    pub fn prune(&self) -> usize {
        let mut guard = self.maps.write();
        let maps = &mut *guard;
        let dead: Vec<WeakRef<H>> = maps
            .forward
            .keys()
            .filter(|key| !key.is_alive())
            .cloned()
            .collect();
        for key in &dead {
            maps.detach(key);
        }

        let IndexMaps { reverse, forward } = maps;
        for holders in reverse.values_mut() {
            holders.retain(|key| key.is_alive() && forward.contains_key(key));
        }
        reverse.retain(|_, holders| !holders.is_empty());

        if !dead.is_empty() {
            tracing::debug!(pruned = dead.len(), "pruned dropped holders");
        }
        dead.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All holders that currently carry `name`, among those registered with
    /// it. Stale bucket entries are evicted along the way.
    pub fn filter(&self, name: &str) -> HolderSet<H> {
        self.collect_bucket(name, |_| true)
    }

    /// Like [`filter`](Self::filter), but the live check also requires the
    /// tag's value to be a `T` equal to `value`. A holder whose tag has a
    /// different value is excluded but stays in the bucket.
    pub fn filter_with<T: Any + PartialEq>(&self, name: &str, value: &T) -> HolderSet<H> {
        self.collect_bucket(name, |h| h.holder().has_tag_with(name, value))
    }

    /// Holders carrying every tag in `with` and none in `without`.
    ///
    /// Candidates come from the smallest `with` bucket; with an empty `with`
    /// set every registered holder is a candidate.
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
        let matches = |h: &H| h.holder().has_all_tags(&with) && !h.holder().has_any_tag(&without);

        if with.is_empty() {
            return self
                .live_holders()
                .into_iter()
                .filter(|h| matches(&**h))
                .collect();
        }

        let smallest = {
            let maps = self.maps.read();
            let mut smallest: Option<(&str, usize)> = None;
            for name in &with {
                let Some(bucket) = maps.reverse.get(name.as_str()) else {
                    // Nothing was ever registered with this tag.
                    return HolderSet::new();
                };
                if smallest.is_none_or(|(_, len)| bucket.len() < len) {
                    smallest = Some((name.as_str(), bucket.len()));
                }
            }
            smallest.map(|(name, _)| name.to_owned())
        };

        match smallest {
            Some(name) => self.collect_bucket(&name, matches),
            None => HolderSet::new(),
        }
    }

    /// Registered holders for which `predicate` holds. `None` matches nothing.
    pub fn filter_by(&self, predicate: Option<&dyn Fn(&H) -> bool>) -> HolderSet<H> {
        match predicate {
            Some(predicate) => self.filter_where(predicate),
            None => HolderSet::new(),
        }
    }

    /// Registered holders for which `predicate` holds.
    ///
    /// The predicate runs after the index lock is released, so it may call
    /// back into the index.
    pub fn filter_where<F>(&self, predicate: F) -> HolderSet<H>
    where
        F: Fn(&H) -> bool,
    {
        self.live_holders()
            .into_iter()
            .filter(|h| predicate(&**h))
            .collect()
    }

    pub fn contains(&self, holder: &HolderRef<H>) -> bool {
        self.maps.read().forward.contains_key(&holder.downgrade())
    }

    /// Number of registered holders, including dropped ones not yet pruned.
    pub fn len(&self) -> usize {
        self.maps.read().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().forward.is_empty()
    }

    /// Tag names that currently have a bucket.
    pub fn indexed_tags(&self) -> Vec<String> {
        self.maps.read().reverse.keys().cloned().collect()
    }

    pub fn stats(&self) -> IndexStats {
        let maps = self.maps.read();
        IndexStats {
            holders: maps.forward.len(),
            dead_holders: maps.forward.keys().filter(|key| !key.is_alive()).count(),
            buckets: maps.reverse.len(),
            memberships: maps.reverse.values().map(HashSet::len).sum(),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Upgraded handles of every registered holder still alive.
    fn live_holders(&self) -> Vec<HolderRef<H>> {
        self.maps
            .read()
            .forward
            .keys()
            .filter_map(WeakRef::upgrade)
            .collect()
    }

    /// Re-validate one bucket against live holder state.
    ///
    /// Entries whose holder is registered, still has `name` and passes
    /// `matches` are returned. Entries whose holder lost `name`, was dropped,
    /// or was unregistered (an orphan) are stale and get evicted afterwards
    /// under the write lock.
    fn collect_bucket<F>(&self, name: &str, matches: F) -> HolderSet<H>
    where
        F: Fn(&H) -> bool,
    {
        let mut result = HolderSet::new();
        let mut stale: SmallVec<[WeakRef<H>; 8]> = SmallVec::new();
        {
            let maps = self.maps.read();
            let Some(bucket) = maps.reverse.get(name) else {
                return result;
            };
            for key in bucket {
                if !maps.forward.contains_key(key) {
                    stale.push(key.clone());
                    continue;
                }
                match key.upgrade() {
                    Some(h) if h.holder().has_tag(name) => {
                        if matches(&*h) {
                            result.insert(h);
                        }
                    }
                    _ => stale.push(key.clone()),
                }
            }
        }

        if !stale.is_empty() {
            self.evict(name, &stale);
        }
        result
    }

    /// Remove stale entries from `name`'s bucket.
    ///
    /// Each entry is checked again: the shared lock was released in between,
    /// and a holder that got its tag back (or was registered again) in that
    /// window must stay.
    fn evict(&self, name: &str, stale: &[WeakRef<H>]) {
        let mut maps = self.maps.write();
        let mut evicted = 0usize;
        for key in stale {
            if !maps.forward.contains_key(key) {
                maps.remove_from_bucket(name, key);
                evicted += 1;
                continue;
            }
            match key.upgrade() {
                None => {
                    maps.remove_from_bucket(name, key);
                    maps.detach(key);
                    evicted += 1;
                }
                Some(h) if !h.holder().has_tag(name) => {
                    maps.remove_from_bucket(name, key);
                    evicted += 1;
                }
                Some(_) => {}
            }
        }
        tracing::trace!(tag = name, evicted, "evicted stale index entries");
    }
}

impl<H: Tagged> Default for Index<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Tagged> fmt::Debug for Index<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let maps = self.maps.read();
        f.debug_struct("Index")
            .field("holders", &maps.forward.len())
            .field("buckets", &maps.reverse.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
