//! # gaia-tags: Dynamic Tags with a Self-Healing Index
//!
//! Lets arbitrary objects carry a mutable set of named tags (optionally with a
//! typed value) and lets callers retrieve every object matching a tag query
//! without scanning all of them.
//!
//! ## Design Principles
//!
//! 1. **Holders own their tags**: a `Holder` is the authoritative tag set and
//!    knows nothing about the registries that reference it
//! 2. **Registries never own holders**: `Index` and `Layer` keep weak
//!    references; the embedding application owns every `HolderRef`
//! 3. **Lazy reconciliation**: the index's reverse map is a cache, re-validated
//!    against live holder state on every query and healed in place
//! 4. **No fault paths**: missing tags, missing holders and type mismatches are
//!    ordinary `false` / `None` / empty results
//!
//! ## Quick Start
//!
//! ```rust
//! use gaia_tags::{Holder, HolderRef, Index};
//!
//! let a = HolderRef::new(Holder::with_tags(["x", "y"]));
//! let b = HolderRef::new(Holder::with_tags(["y"]));
//!
//! let index = Index::new();
//! index.register(&a);
//! index.register(&b);
//!
//! assert_eq!(index.filter("y").len(), 2);
//! assert!(index.filter_tags(["y"], ["x"]).contains(&b));
//!
//! // Losing a tag is picked up by the next query on that tag.
//! a.remove_tag("x");
//! assert!(index.filter("x").is_empty());
//! ```
//!
//! ## Registries
//!
//! | Registry | Query cost | Sees tags added after registration |
//! |----------|------------|------------------------------------|
//! | `Index`  | O(bucket)  | Only after `register` is called again |
//! | `Layer`  | O(members), parallel | Always |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod index;
pub mod layer;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Tag, TagValue, Holder, HolderRef, HolderSet, Predicate, Tagged};
pub use index::{Index, IndexStats};
pub use layer::{Layer, LayerConfig};

// ============================================================================
// Error Types
// ============================================================================

/// Construction-time failures. Tag queries and registry operations never
/// fail; they report absence through `bool`, `Option` or an empty set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
