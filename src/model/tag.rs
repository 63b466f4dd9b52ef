//! Tag: a named label with an optional typed value.

use std::any::Any;

use super::TagValue;

/// A named feature carried by a [`Holder`](super::Holder).
///
/// The name is fixed at construction. The value may be replaced when a
/// same-named tag is inserted into a holder again.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    value: Option<TagValue>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), value: None }
    }

    pub fn with_value<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value: Some(TagValue::new(value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&TagValue> {
        self.value.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the value as `T`. `None` if valueless or of another type.
    pub fn value_as<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }

    pub(crate) fn set_value(&mut self, value: Option<TagValue>) {
        self.value = value;
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    pub fn name_equal(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn name_equal_tag(&self, other: &Tag) -> bool {
        self.name == other.name
    }

    /// True iff this tag has a value of type `T` equal to `value`.
    pub fn value_equal<T: Any + PartialEq>(&self, value: &T) -> bool {
        self.value.as_ref().is_some_and(|v| v.eq_value(value))
    }

    /// True iff both tags carry a `T` and the two values are equal.
    pub fn value_equal_tag<T: Any + PartialEq>(&self, other: &Tag) -> bool {
        match (self.value_as::<T>(), other.value_as::<T>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Name-equal, and either both valueless or both holding equal `T` values.
    pub fn tag_equal<T: Any + PartialEq>(&self, other: &Tag) -> bool {
        if !self.name_equal_tag(other) {
            return false;
        }
        match (&self.value, &other.value) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_type(b) && self.value_equal_tag::<T>(other),
            _ => false,
        }
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, name: &str) -> bool {
        self.name_equal(name)
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, name: &&str) -> bool {
        self.name_equal(name)
    }
}
