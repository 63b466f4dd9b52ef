//! # Tag Model
//!
//! Tags, their type-erased values, the per-object `Holder`, and the handles
//! through which holders are shared with indices and layers.
//!
//! Design rule: nothing here knows about indices or layers. A holder never
//! calls out of itself, which keeps the lock order one-way
//! (registry lock → holder lock).

pub mod value;
pub mod tag;
pub mod holder;
pub mod handle;

pub use value::TagValue;
pub use tag::Tag;
pub use holder::Holder;
pub use handle::{HolderRef, HolderSet, Predicate, Tagged};
pub(crate) use handle::WeakRef;
