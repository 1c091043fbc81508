//! Comparator builders for sorting documents.

use super::value::{compare_values, defined, resolve_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// A shareable document comparator.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// A shareable document predicate.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One key of a compound sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    /// Dot path of the sort key.
    pub field: String,
    /// Sort this key descending.
    #[serde(default)]
    pub descending: bool,
}

impl SortCriterion {
    /// Ascending criterion on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending criterion on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Compares two documents on one field.
///
/// Null and absent values sort after every defined value regardless of
/// direction.
pub fn compare_field(a: &Value, b: &Value, field: &str, descending: bool) -> Ordering {
    match (
        defined(resolve_path(a, field)),
        defined(resolve_path(b, field)),
    ) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Builds a single-field comparator.
pub fn simple_comparator(field: impl Into<String>, descending: bool) -> Comparator {
    let field = field.into();
    Arc::new(move |a, b| compare_field(a, b, &field, descending))
}

/// Builds a cascading multi-field comparator.
pub fn compound_comparator(criteria: &[SortCriterion]) -> Comparator {
    let criteria = criteria.to_vec();
    Arc::new(move |a, b| {
        criteria
            .iter()
            .map(|c| compare_field(a, b, &c.field, c.descending))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nullish_sorts_last_both_ways() {
        let mut docs = vec![json!({"a": null}), json!({"a": 2}), json!({}), json!({"a": 1})];

        docs.sort_by(|x, y| compare_field(x, y, "a", false));
        assert_eq!(docs[0]["a"], 1);
        assert_eq!(docs[1]["a"], 2);

        docs.sort_by(|x, y| compare_field(x, y, "a", true));
        assert_eq!(docs[0]["a"], 2);
        assert_eq!(docs[1]["a"], 1);
        assert!(docs[2].get("a").map_or(true, Value::is_null));
    }

    #[test]
    fn compound_cascades() {
        let cmp = compound_comparator(&[SortCriterion::asc("group"), SortCriterion::desc("n")]);
        let mut docs = vec![
            json!({"group": "b", "n": 1}),
            json!({"group": "a", "n": 1}),
            json!({"group": "a", "n": 5}),
        ];
        docs.sort_by(|x, y| cmp(x, y));
        assert_eq!(
            docs,
            vec![
                json!({"group": "a", "n": 5}),
                json!({"group": "a", "n": 1}),
                json!({"group": "b", "n": 1}),
            ]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let cmp = simple_comparator("k", false);
        let mut docs: Vec<_> = (0..5).map(|i| json!({"k": 1, "i": i})).collect();
        docs.sort_by(|x, y| cmp(x, y));
        let order: Vec<_> = docs.iter().map(|d| d["i"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
