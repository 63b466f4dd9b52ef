//! Type-erased tag payload.
//!
//! A tag value's concrete type is only known by whoever queries it, so the
//! payload is stored behind `dyn Any` and read back with a fallible downcast.
//! A wrong type is never an error: it reads as "no value" / "not equal".

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Dynamically typed value attached to a [`Tag`](super::Tag).
///
/// Cloning is cheap (the payload is reference counted), which keeps
/// `Holder::get_tag` snapshots inexpensive.
#[derive(Clone)]
pub struct TagValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl TagValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, or `None` if it holds another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Name of the concrete type stored, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }

    /// True if both payloads hold the same concrete type.
    pub fn same_type(&self, other: &TagValue) -> bool {
        self.type_id() == other.type_id()
    }

    /// Typed comparison. Fails closed on a type mismatch.
    pub fn eq_value<T: Any + PartialEq>(&self, value: &T) -> bool {
        self.downcast_ref::<T>().is_some_and(|v| v == value)
    }
}

impl fmt::Debug for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagValue<{}>", self.type_name)
    }
}
