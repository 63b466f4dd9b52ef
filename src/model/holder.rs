//! Holder: the per-object tag set.
//!
//! Every operation is safe to call concurrently on the same holder. Mutations
//! take the write lock, queries take the read lock. Typed lookups locate and
//! compare under a single acquisition, so an entry can never vanish between
//! "found" and "checked".

use std::any::Any;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use super::{Tag, TagValue};

/// A concurrent set of tags, unique by name.
#[derive(Debug, Default)]
pub struct Holder {
    tags: RwLock<HashMap<String, Tag>>,
}

impl Holder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a holder pre-populated with valueless tags.
    pub fn with_tags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let holder = Self::new();
        holder.add_tags(names);
        holder
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a valueless tag. No-op if a tag with that name already exists.
    pub fn add_tag(&self, name: impl Into<String>) {
        let name = name.into();
        let mut tags = self.tags.write();
        if !tags.contains_key(&name) {
            tags.insert(name.clone(), Tag::new(name));
        }
    }

    /// Add a tag carrying `value`, replacing the value of an existing tag.
    pub fn add_tag_with<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.insert(Tag::with_value(name, value));
    }

    /// Insert `tag`. If the name is already present only its value is replaced.
    pub fn insert(&self, tag: Tag) {
        let mut tags = self.tags.write();
        match tags.get_mut(tag.name()) {
            Some(existing) => existing.set_value(tag.value().cloned()),
            None => {
                tags.insert(tag.name().to_owned(), tag);
            }
        }
    }

    /// Add each name in order. Not atomic as a batch: readers may observe a
    /// partially applied batch.
    pub fn add_tags<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_tag(name);
        }
    }

    /// Returns true iff a tag with that name existed and was removed.
    pub fn remove_tag(&self, name: &str) -> bool {
        self.tags.write().remove(name).is_some()
    }

    /// Remove the tag only if it carries a `T` equal to `value`.
    pub fn remove_tag_with<T: Any + PartialEq>(&self, name: &str, value: &T) -> bool {
        let mut tags = self.tags.write();
        let matches = tags.get(name).is_some_and(|t| t.value_equal(value));
        if matches {
            tags.remove(name);
        }
        matches
    }

    /// Remove every listed name. Returns how many tags were actually removed.
    pub fn remove_tags<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = self.tags.write();
        names
            .into_iter()
            .map(|name| tags.remove(name.as_ref()).is_some())
            .filter(|&removed| removed)
            .count()
    }

    pub fn clear_tags(&self) {
        self.tags.write().clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.read().contains_key(name)
    }

    /// Typed check. False on a missing tag, a valueless tag, or a type mismatch.
    pub fn has_tag_with<T: Any + PartialEq>(&self, name: &str, value: &T) -> bool {
        self.tags.read().get(name).is_some_and(|t| t.value_equal(value))
    }

    /// Vacuously true for an empty set.
    pub fn has_all_tags<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = self.tags.read();
        names.into_iter().all(|name| tags.contains_key(name.as_ref()))
    }

    /// Vacuously false for an empty set.
    pub fn has_any_tag<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = self.tags.read();
        names.into_iter().any(|name| tags.contains_key(name.as_ref()))
    }

    /// Snapshot of the named tag.
    pub fn get_tag(&self, name: &str) -> Option<Tag> {
        self.tags.read().get(name).cloned()
    }

    /// Snapshot of the named tag, only if it carries a `T` equal to `value`.
    pub fn get_tag_with<T: Any + PartialEq>(&self, name: &str, value: &T) -> Option<Tag> {
        self.tags
            .read()
            .get(name)
            .filter(|t| t.value_equal(value))
            .cloned()
    }

    /// The tag's value as `T`, or `None` if missing, valueless or another type.
    pub fn get_tag_value<T: Any + Clone>(&self, name: &str) -> Option<T> {
        self.tags.read().get(name)?.value_as::<T>().cloned()
    }

    /// The type-erased value of the named tag.
    pub fn get_raw_value(&self, name: &str) -> Option<TagValue> {
        self.tags.read().get(name)?.value().cloned()
    }

    /// Snapshot of the names currently present. Not kept in sync with later
    /// mutation.
    pub fn tag_names(&self) -> HashSet<String> {
        self.tags.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_has_remove() {
        let holder = Holder::new();
        holder.add_tag("SampleTag");
        assert!(holder.has_tag("SampleTag"));
        assert!(!holder.has_tag("SampleTest2"));

        assert!(!holder.remove_tag("SampleTag3"));
        assert!(holder.has_tag("SampleTag"));
        assert!(holder.remove_tag("SampleTag"));
        assert!(!holder.has_tag("SampleTag"));
    }

    #[test]
    fn test_values() {
        let holder = Holder::new();
        holder.add_tag_with("ValueTag", 3i32);
        assert_eq!(holder.get_tag_value::<i32>("ValueTag"), Some(3));
        assert!(holder.get_tag("ValueTag").is_some());
        assert!(holder.get_tag_with("ValueTag", &3i32).is_some());
        assert!(holder.get_tag_with("ValueTag2", &3i32).is_none());
        assert!(holder.get_tag_with("ValueTag", &4i32).is_none());
        assert!(holder.get_tag_with("ValueTag", &3i64).is_none());
        assert_eq!(holder.get_tag_value::<String>("ValueTag"), None);
    }

    #[test]
    fn test_readd_replaces_value_only() {
        let holder = Holder::new();
        holder.add_tag_with("hp", 10u32);
        holder.add_tag_with("hp", 7u32);
        assert_eq!(holder.len(), 1);
        assert_eq!(holder.get_tag_value::<u32>("hp"), Some(7));

        holder.add_tag_with("hp", String::from("full"));
        assert_eq!(holder.get_tag_value::<u32>("hp"), None);
        assert_eq!(holder.get_tag_value::<String>("hp").as_deref(), Some("full"));
    }

    #[test]
    fn test_add_tag_keeps_existing_value() {
        let holder = Holder::new();
        holder.add_tag_with("hp", 10u32);
        holder.add_tag("hp");
        assert_eq!(holder.get_tag_value::<u32>("hp"), Some(10));
    }

    #[test]
    fn test_insert_valueless_clears_value() {
        let holder = Holder::new();
        holder.add_tag_with("hp", 10u32);
        holder.insert(Tag::new("hp"));
        assert!(holder.has_tag("hp"));
        assert!(holder.get_raw_value("hp").is_none());
    }

    #[test]
    fn test_remove_with_value() {
        let holder = Holder::new();
        holder.add_tag_with("team", 2u8);
        holder.add_tag("plain");
        assert!(!holder.remove_tag_with("team", &3u8));
        assert!(!holder.remove_tag_with("team", &2i32));
        assert!(!holder.remove_tag_with("plain", &2u8));
        assert!(holder.has_tag("team"));
        assert!(holder.remove_tag_with("team", &2u8));
        assert!(!holder.has_tag("team"));
    }

    #[test]
    fn test_batch_and_set_queries() {
        let holder = Holder::new();
        holder.add_tags(["SampleTag1", "SampleTag2", "SampleTag3"]);
        assert_eq!(holder.len(), 3);
        assert!(holder.has_all_tags(["SampleTag1", "SampleTag3"]));
        assert!(!holder.has_all_tags(["SampleTag1", "Missing"]));
        assert!(holder.has_any_tag(["Missing", "SampleTag2"]));
        assert!(!holder.has_any_tag(["Missing"]));

        let none: [&str; 0] = [];
        assert!(holder.has_all_tags(none));
        assert!(!holder.has_any_tag(none));

        assert_eq!(holder.remove_tags(["SampleTag1", "Missing"]), 1);
        assert_eq!(holder.len(), 2);
    }

    #[test]
    fn test_tag_names_snapshot() {
        let holder = Holder::with_tags(["a", "b"]);
        let names = holder.tag_names();
        holder.add_tag("c");
        assert_eq!(names.len(), 2);
        assert!(names.contains("a") && names.contains("b"));
        assert_eq!(holder.tag_names().len(), 3);

        holder.clear_tags();
        assert!(holder.is_empty());
    }
}
