//! Holder handles.
//!
//! The embedding application owns its tagged objects through [`HolderRef`].
//! Indices and layers only ever keep a [`WeakRef`], so they never extend an
//! object's lifetime. An object dropped without being unregistered first shows
//! up as a dead weak reference and is pruned lazily instead of dangling.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, Weak};

use hashbrown::HashSet;

use super::Holder;

/// Anything that carries a [`Holder`].
///
/// Implement this for domain objects (scene nodes, entities, ...) that embed
/// a holder so they can be registered into an `Index` or `Layer` directly.
pub trait Tagged: Send + Sync {
    fn holder(&self) -> &Holder;
}

impl Tagged for Holder {
    fn holder(&self) -> &Holder {
        self
    }
}

/// Query result: the matching holders, in no particular order.
pub type HolderSet<H = Holder> = HashSet<HolderRef<H>>;

/// Arbitrary holder test used by predicate queries.
pub type Predicate<H = Holder> = dyn Fn(&H) -> bool + Send + Sync;

// ============================================================================
// HolderRef
// ============================================================================

/// Shared handle to a tagged object. Equality and hashing use identity
/// (the allocation address), never the tags.
pub struct HolderRef<H = Holder> {
    inner: Arc<H>,
}

impl<H> HolderRef<H> {
    pub fn new(holder: H) -> Self {
        Self { inner: Arc::new(holder) }
    }

    pub fn from_arc(inner: Arc<H>) -> Self {
        Self { inner }
    }

    pub fn as_arc(&self) -> &Arc<H> {
        &self.inner
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRef<H> {
        WeakRef { inner: Arc::downgrade(&self.inner) }
    }
}

impl<H> Clone for HolderRef<H> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<H> Deref for HolderRef<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.inner
    }
}

impl<H> From<Arc<H>> for HolderRef<H> {
    fn from(inner: Arc<H>) -> Self {
        Self::from_arc(inner)
    }
}

impl<H> PartialEq for HolderRef<H> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<H> Eq for HolderRef<H> {}

impl<H> Hash for HolderRef<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl<H> fmt::Debug for HolderRef<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HolderRef({:p})", Arc::as_ptr(&self.inner))
    }
}

// ============================================================================
// WeakRef
// ============================================================================

/// Non-owning registry entry. Keyed by the same address as the `HolderRef`
/// it came from; the address stays reserved while the weak count is nonzero,
/// so it can't be reused by another holder while an entry exists.
pub(crate) struct WeakRef<H> {
    inner: Weak<H>,
}

impl<H> WeakRef<H> {
    pub(crate) fn upgrade(&self) -> Option<HolderRef<H>> {
        self.inner.upgrade().map(HolderRef::from_arc)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<H> Clone for WeakRef<H> {
    fn clone(&self) -> Self {
        Self { inner: Weak::clone(&self.inner) }
    }
}

impl<H> PartialEq for WeakRef<H> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl<H> Eq for WeakRef<H> {}

impl<H> Hash for WeakRef<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.inner.as_ptr().hash(state);
    }
}

impl<H> fmt::Debug for WeakRef<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({:p})", self.inner.as_ptr())
    }
}
