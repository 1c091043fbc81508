//! Property-based test generators using proptest.
//!
//! Documents are drawn from a deliberately small value space (few cities,
//! small ages, fields sometimes missing) so generated queries hit duplicates
//! and absent values often.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Cities used by generated documents.
pub const CITIES: [&str; 4] = ["Oslo", "Rome", "Lima", "Pune"];

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for a scalar JSON value of any comparable kind, including null.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (0i64..20).prop_map(Value::from),
        2 => prop::sample::select(CITIES.to_vec()).prop_map(Value::from),
        1 => any::<bool>().prop_map(Value::from),
        1 => Just(Value::Null),
    ]
}

/// Strategy for a document with optional `age`, `city`, `score` and
/// `active` fields.
pub fn document_strategy() -> impl Strategy<Value = Value> {
    (
        prop::option::of(0i64..10),
        prop::option::of(prop::sample::select(CITIES.to_vec())),
        prop::option::of(scalar_strategy()),
        any::<bool>(),
    )
        .prop_map(|(age, city, score, active)| {
            let mut map = Map::new();
            if let Some(age) = age {
                map.insert("age".into(), json!(age));
            }
            if let Some(city) = city {
                map.insert("city".into(), json!(city));
            }
            if let Some(score) = score {
                map.insert("score".into(), score);
            }
            map.insert("active".into(), json!(active));
            Value::Object(map)
        })
}

/// Strategy for a batch of documents.
pub fn documents_strategy(max: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(document_strategy(), 0..max)
}

/// Strategy for a single-field query an `age` index can serve.
pub fn indexable_query_strategy() -> impl Strategy<Value = Value> {
    let operand = prop_oneof![
        4 => (0i64..10).prop_map(Value::from),
        1 => Just(Value::Null),
        1 => Just(json!("Oslo")),
    ];
    (0usize..6, operand).prop_map(|(op, v)| match op {
        0 => json!({ "age": v }),
        1 => json!({ "age": { "$gt": v } }),
        2 => json!({ "age": { "$gte": v } }),
        3 => json!({ "age": { "$lt": v } }),
        4 => json!({ "age": { "$lte": v } }),
        _ => json!({ "age": { "$between": [v, 7] } }),
    })
}

/// Strategy for a view filter query.
pub fn filter_query_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({ "active": true })),
        (0i64..10).prop_map(|a| json!({ "age": { "$gte": a } })),
        prop::sample::select(CITIES.to_vec()).prop_map(|c| json!({ "city": c })),
        Just(json!({ "score": { "$exists": true }, "active": false })),
    ]
}

/// A mutation applied to a collection in generated sequences.
///
/// Targets are indices into the live documents, taken modulo their count.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert a document.
    Insert(Value),
    /// Replace the fields of a live document.
    Update {
        /// Target index.
        target: usize,
        /// New field values.
        doc: Value,
    },
    /// Remove a live document.
    Remove {
        /// Target index.
        target: usize,
    },
}

/// Strategy for one mutation.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => document_strategy().prop_map(Mutation::Insert),
        2 => (any::<usize>(), document_strategy())
            .prop_map(|(target, doc)| Mutation::Update { target, doc }),
        1 => any::<usize>().prop_map(|target| Mutation::Remove { target }),
    ]
}

/// Strategy for a sequence of mutations.
pub fn mutation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn documents_are_objects_without_identity(doc in document_strategy()) {
            prop_assert!(doc.is_object());
            prop_assert!(doc.get("$id").is_none());
            prop_assert!(doc["active"].is_boolean());
        }

        #[test]
        fn collection_name_is_valid(name in collection_name_strategy()) {
            let first = name.chars().next();
            prop_assert!(first.is_some_and(|c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn indexable_queries_parse(query in indexable_query_strategy()) {
            prop_assert!(emberdb_core::Query::parse(&query).is_ok());
        }
    }
}
