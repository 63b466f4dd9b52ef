//! Property tests for holder and index behavior.

use gaia_tags::{Holder, HolderRef, Index, Layer};
use proptest::prelude::*;

fn tag_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_owned)
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    AddValue(String, i64),
    Remove(String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        tag_name().prop_map(Op::Add),
        (tag_name(), any::<i64>()).prop_map(|(n, v)| Op::AddValue(n, v)),
        tag_name().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_add_then_remove(name in tag_name(), others in prop::collection::vec(tag_name(), 0..5)) {
        let holder = Holder::with_tags(others);
        holder.add_tag(name.as_str());
        prop_assert!(holder.has_tag(&name));
        prop_assert!(holder.remove_tag(&name));
        prop_assert!(!holder.has_tag(&name));
    }

    #[test]
    fn prop_readd_updates_value_without_duplicating(name in tag_name(), first in any::<i64>(), second in any::<i64>()) {
        let holder = Holder::new();
        holder.add_tag_with(name.as_str(), first);
        holder.add_tag_with(name.as_str(), second);
        prop_assert!(holder.has_tag(&name));
        prop_assert_eq!(holder.len(), 1);
        prop_assert_eq!(holder.get_tag_value::<i64>(&name), Some(second));
    }

    #[test]
    fn prop_empty_set_queries(names in prop::collection::vec(tag_name(), 0..5)) {
        let holder = Holder::with_tags(names);
        let none: [&str; 0] = [];
        prop_assert!(holder.has_all_tags(none));
        prop_assert!(!holder.has_any_tag(none));
    }

    #[test]
    fn prop_typed_get_matches_only_type_and_value(stored in any::<i64>(), queried in any::<i64>()) {
        let holder = Holder::new();
        holder.add_tag_with("v", stored);
        holder.add_tag("plain");
        prop_assert_eq!(holder.get_tag_with("v", &queried).is_some(), stored == queried);
        prop_assert!(holder.get_tag_with("v", &(stored as i32)).is_none());
        prop_assert!(holder.get_tag_with("plain", &stored).is_none());
    }

    /// After any mutation sequence, a query never returns a holder lacking
    /// the tag, and never misses one that had it at registration and still
    /// has it.
    #[test]
    fn prop_index_never_lies(
        initial in prop::collection::vec(prop::collection::vec(tag_name(), 0..4), 1..8),
        ops in prop::collection::vec((0usize..8, op()), 0..32),
        query in tag_name(),
    ) {
        let holders: Vec<HolderRef> = initial.into_iter().map(|t| HolderRef::new(Holder::with_tags(t))).collect();
        let index = Index::new();
        index.register_all(&holders);
        let registered_with: Vec<bool> = holders.iter().map(|h| h.has_tag(&query)).collect();

        for (i, op) in ops {
            let h = &holders[i % holders.len()];
            match op {
                Op::Add(n) => h.add_tag(n),
                Op::AddValue(n, v) => h.add_tag_with(n, v),
                Op::Remove(n) => { h.remove_tag(&n); }
            }
        }

        let found = index.filter(&query);
        for (h, was_registered) in holders.iter().zip(registered_with) {
            if found.contains(h) {
                prop_assert!(h.has_tag(&query));
            } else if was_registered {
                prop_assert!(!h.has_tag(&query));
            }
        }
        prop_assert_eq!(index.filter(&query), found);
    }

    /// Immediately after registration the index and the layer agree.
    #[test]
    fn prop_index_matches_layer(
        initial in prop::collection::vec(prop::collection::vec(tag_name(), 0..4), 0..12),
        with in prop::collection::vec(tag_name(), 0..3),
        without in prop::collection::vec(tag_name(), 0..2),
    ) {
        let holders: Vec<HolderRef> = initial.into_iter().map(|t| HolderRef::new(Holder::with_tags(t))).collect();
        let index = Index::new();
        let layer = Layer::new();
        index.register_all(&holders);
        layer.add_holders(&holders);

        prop_assert_eq!(
            index.filter_tags(&with, &without),
            layer.filter_tags(&with, &without)
        );
    }
}
