//! Value helpers shared by matching, sorting and indexing.

use serde_json::Value;
use std::cmp::Ordering;

/// Resolves a dot-separated path against a document.
///
/// Returns `None` when any segment is missing or the path descends into a
/// non-object value. Never panics.
///
/// ```rust
/// use emberdb_core::query::resolve_path;
/// use serde_json::json;
///
/// let doc = json!({"address": {"city": "Oslo"}});
/// assert_eq!(resolve_path(&doc, "address.city"), Some(&json!("Oslo")));
/// assert_eq!(resolve_path(&doc, "address.city.name"), None);
/// ```
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = doc.as_object().and_then(|m| m.get(path)) {
        return Some(direct);
    }
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Treats `null` the same as an absent value.
pub(crate) fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

pub(crate) fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
        Value::Null => 5,
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Total order over JSON values.
///
/// Values of different kinds order as numbers, strings, booleans, arrays,
/// objects, then null. Numbers compare numerically, so `1` equals `1.0`.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut left: Vec<_> = x.iter().collect();
            let mut right: Vec<_> = y.iter().collect();
            left.sort_by(|p, q| p.0.cmp(q.0));
            right.sort_by(|p, q| p.0.cmp(q.0));
            for ((lk, lv), (rk, rv)) in left.iter().zip(&right) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            left.len().cmp(&right.len())
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Deep equality with numeric normalization.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Orders two values only when they are of the same comparable kind.
///
/// Numbers compare with numbers and strings with strings. Anything else
/// yields `None` so range operators evaluate to false.
pub(crate) fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            Some(compare_values(a, b))
        }
        _ => None,
    }
}

/// Loose truthiness: `null`, `false`, `0`, `""` and absence are false.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Type name used by `$type`.
pub(crate) fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_nested_paths() {
        let doc = json!({"a": {"b": {"c": 3}}, "x": [1, 2]});
        assert_eq!(resolve_path(&doc, "a.b.c"), Some(&json!(3)));
        assert_eq!(resolve_path(&doc, "a.z"), None);
        assert_eq!(resolve_path(&doc, "x.0"), None);
        assert_eq!(resolve_path(&json!(5), "a"), None);
    }

    #[test]
    fn resolve_prefers_literal_dotted_key() {
        let doc = json!({"a.b": 1, "a": {"b": 2}});
        assert_eq!(resolve_path(&doc, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn numbers_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(compare_values(&json!(-3), &json!(2.5)), Ordering::Less);
        assert_eq!(compare_values(&json!(u64::MAX), &json!(1)), Ordering::Greater);
    }

    #[test]
    fn kinds_have_fixed_rank() {
        let mut values = vec![
            json!(null),
            json!({"a": 1}),
            json!([1]),
            json!(true),
            json!("s"),
            json!(10),
        ];
        values.sort_by(compare_values);
        assert_eq!(
            values,
            vec![json!(10), json!("s"), json!(true), json!([1]), json!({"a": 1}), json!(null)]
        );
    }

    #[test]
    fn mismatched_kinds_are_not_comparable() {
        assert_eq!(comparable(&json!(1), &json!("1")), None);
        assert_eq!(comparable(&json!("a"), &json!("b")), Some(Ordering::Less));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(truthy(Some(&json!([]))));
        assert!(truthy(Some(&json!("no"))));
    }
}
