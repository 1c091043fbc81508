//! Property tests over collections, indices and views.

use emberdb_core::{
    doc_id, Collection, CollectionOptions, DbError, DynamicViewOptions, Meta, ID_FIELD,
};
use emberdb_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;

fn apply(collection: &mut Collection, mutation: &Mutation) {
    match mutation {
        Mutation::Insert(doc) => {
            collection.insert_one(doc.clone()).unwrap();
        }
        Mutation::Update { target, doc } => {
            let ids = collection.chain().ids();
            if ids.is_empty() {
                return;
            }
            let mut doc = doc.clone();
            doc[ID_FIELD] = json!(ids[target % ids.len()]);
            collection.update_one(doc).unwrap();
        }
        Mutation::Remove { target } => {
            let ids = collection.chain().ids();
            if ids.is_empty() {
                return;
            }
            collection.remove_by_id(ids[target % ids.len()]).unwrap();
        }
    }
}

fn sorted(mut ids: Vec<u64>) -> Vec<u64> {
    ids.sort_unstable();
    ids
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn index_and_scan_agree(
        docs in documents_strategy(40),
        query in indexable_query_strategy(),
    ) {
        let mut indexed = Collection::new("indexed", CollectionOptions::new().index("age"));
        let mut plain = Collection::new("plain", CollectionOptions::new());
        indexed.insert(docs.clone()).unwrap();
        plain.insert(docs).unwrap();

        let via_index = sorted(indexed.chain().find(&query).unwrap().ids());
        let via_scan = sorted(plain.chain().find(&query).unwrap().ids());
        prop_assert_eq!(via_index, via_scan);
    }

    #[test]
    fn index_survives_mutations(ops in mutation_sequence_strategy(1, 40)) {
        let mut collection = Collection::new("c", CollectionOptions::new().index("age"));
        for op in &ops {
            apply(&mut collection, op);
        }
        prop_assert!(collection.check_index("age"));
    }

    #[test]
    fn views_track_find_results(
        ops in mutation_sequence_strategy(1, 40),
        filter in filter_query_strategy(),
    ) {
        let mut collection = Collection::new("c", CollectionOptions::new().index("age"));
        collection
            .add_dynamic_view("live", DynamicViewOptions::new().persistent(true))
            .unwrap()
            .apply_find(&filter, None)
            .unwrap()
            .apply_simple_sort("age", false);
        collection
            .add_dynamic_view("lazy", DynamicViewOptions::new())
            .unwrap()
            .apply_find(&filter, None)
            .unwrap();

        for op in &ops {
            apply(&mut collection, op);
            let count = collection.chain().find(&filter).unwrap().count();
            prop_assert_eq!(collection.get_dynamic_view("live").unwrap().count(), count);
        }

        let expected = collection
            .chain()
            .find(&filter)
            .unwrap()
            .simplesort("age", false)
            .ids();
        let live = collection.get_dynamic_view("live").unwrap().ids();
        let lazy = collection.get_dynamic_view("lazy").unwrap().ids();
        prop_assert_eq!(&live, &expected);
        prop_assert_eq!(sorted(lazy), sorted(expected));
    }

    #[test]
    fn revisions_count_updates(doc in document_strategy(), updates in 0usize..8) {
        let mut collection = Collection::new("c", CollectionOptions::new());
        let stored = collection.insert_one(doc).unwrap();
        let id = doc_id(&stored).unwrap();
        let created = Meta::of(&stored).unwrap().created;

        let mut last_revision = 0;
        for n in 0..updates {
            let mut next = collection.get(id).unwrap().clone();
            next["n"] = json!(n);
            let updated = collection.update_one(next).unwrap();
            let meta = Meta::of(&updated).unwrap();
            prop_assert_eq!(meta.created, created);
            prop_assert!(meta.revision > last_revision);
            prop_assert!(meta.updated.is_some_and(|u| u >= created));
            last_revision = meta.revision;
        }
        prop_assert_eq!(Meta::of(collection.get(id).unwrap()).unwrap().revision, updates as u64);
    }

    #[test]
    fn serialization_preserves_contents(ops in mutation_sequence_strategy(0, 30)) {
        let mut collection = Collection::new("c", CollectionOptions::new().index("age"));
        for op in &ops {
            apply(&mut collection, op);
        }

        let restored = Collection::deserialize(collection.serialize()).unwrap();
        prop_assert_eq!(restored.chain().data(), collection.chain().data());
        prop_assert_eq!(restored.max_id(), collection.max_id());
        prop_assert!(restored.check_index("age"));
        prop_assert!(!restored.is_dirty());
    }

    #[test]
    fn paging_is_a_slice_of_the_sorted_result(
        docs in documents_strategy(30),
        skip in 0usize..35,
        take in 0usize..35,
    ) {
        let mut collection = Collection::new("c", CollectionOptions::new());
        collection.insert(docs).unwrap();

        let all = collection.chain().simplesort("age", true).ids();
        let page = collection
            .chain()
            .simplesort("age", true)
            .offset(skip)
            .limit(take)
            .ids();
        let expected: Vec<u64> = all.into_iter().skip(skip).take(take).collect();
        prop_assert_eq!(page, expected);
    }

    #[test]
    fn paging_ignores_insertion_order(
        docs in documents_strategy(30),
        take in 0usize..35,
        skip in 0usize..35,
    ) {
        let mut shuffled = Collection::new("shuffled", CollectionOptions::new());
        shuffled.insert(docs.clone()).unwrap();

        let mut presorted_docs = docs;
        presorted_docs.sort_by_key(|d| d.get("age").and_then(Value::as_i64));
        let mut presorted = Collection::new("presorted", CollectionOptions::new());
        presorted.insert(presorted_docs).unwrap();

        let page_ages = |c: &Collection| {
            c.chain()
                .simplesort("age", false)
                .limit(take)
                .offset(skip)
                .map(|d| d.get("age").cloned())
        };
        prop_assert_eq!(page_ages(&shuffled), page_ages(&presorted));
    }

    #[test]
    fn unique_constraint_admits_first_of_each_value(docs in documents_strategy(30)) {
        let mut collection = Collection::new("c", CollectionOptions::new().unique("city"));
        let mut seen = HashSet::new();
        let mut expected = 0;
        for doc in docs {
            let city = doc.get("city").and_then(Value::as_str).map(str::to_string);
            let fresh = city.as_ref().map_or(true, |c| seen.insert(c.clone()));
            match collection.insert_one(doc) {
                Ok(_) => {
                    prop_assert!(fresh);
                    expected += 1;
                }
                Err(err) => {
                    prop_assert!(!fresh);
                    let is_unique_violation = matches!(err, DbError::UniqueViolation { .. });
                    prop_assert!(is_unique_violation);
                }
            }
        }
        prop_assert_eq!(collection.len(), expected);
        for city in CITIES {
            prop_assert_eq!(collection.by("city", &json!(city)).unwrap().is_some(), seen.contains(city));
        }
    }
}
