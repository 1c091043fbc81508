//! Binary (sorted) and unique indices.

use super::store::DocStore;
use crate::document::DocId;
use crate::query::{compare_values, resolve_path, type_rank, Operator};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sorted index on one field.
///
/// Entries are ordered by `(key, id)` using [`compare_values`], so absent
/// and `null` keys gather at the end. Lookups return candidate identities;
/// callers confirm every candidate with the full matcher.
#[derive(Debug, Clone)]
pub(crate) struct BinaryIndex {
    field: String,
    entries: Vec<IndexEntry>,
    dirty: bool,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    key: Value,
    id: DocId,
}

fn key_of(doc: &Value, field: &str) -> Value {
    resolve_path(doc, field).cloned().unwrap_or(Value::Null)
}

fn entry_order(entry: &IndexEntry, key: &Value, id: DocId) -> Ordering {
    compare_values(&entry.key, key).then(entry.id.cmp(&id))
}

impl BinaryIndex {
    pub fn build(field: &str, store: &DocStore) -> Self {
        let mut entries: Vec<IndexEntry> = store
            .iter()
            .map(|(id, doc)| IndexEntry {
                key: key_of(doc, field),
                id,
            })
            .collect();
        entries.sort_by(|a, b| compare_values(&a.key, &b.key).then(a.id.cmp(&b.id)));
        Self {
            field: field.to_string(),
            entries,
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirty = false;
    }

    pub fn insert(&mut self, doc: &Value, id: DocId) {
        let key = key_of(doc, &self.field);
        let at = self
            .entries
            .partition_point(|e| entry_order(e, &key, id) == Ordering::Less);
        self.entries.insert(at, IndexEntry { key, id });
    }

    pub fn remove(&mut self, doc: &Value, id: DocId) {
        let key = key_of(doc, &self.field);
        match self
            .entries
            .binary_search_by(|e| entry_order(e, &key, id))
        {
            Ok(at) => {
                self.entries.remove(at);
            }
            Err(_) => self.entries.retain(|e| e.id != id),
        }
    }

    pub fn update(&mut self, old: &Value, new: &Value, id: DocId) {
        self.remove(old, id);
        self.insert(new, id);
    }

    /// Identities in index order.
    pub fn ordered_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    fn lower(&self, key: &Value, inclusive: bool) -> usize {
        self.entries.partition_point(|e| match compare_values(&e.key, key) {
            Ordering::Less => true,
            Ordering::Equal => !inclusive,
            Ordering::Greater => false,
        })
    }

    fn upper(&self, key: &Value, inclusive: bool) -> usize {
        self.entries.partition_point(|e| match compare_values(&e.key, key) {
            Ordering::Less => true,
            Ordering::Equal => inclusive,
            Ordering::Greater => false,
        })
    }

    fn rank_bounds(&self, key: &Value) -> (usize, usize) {
        let rank = type_rank(key);
        (
            self.entries.partition_point(|e| type_rank(&e.key) < rank),
            self.entries.partition_point(|e| type_rank(&e.key) <= rank),
        )
    }

    /// Candidate identities for `op`, or `None` if the index cannot serve it.
    pub fn probe(&self, op: &Operator) -> Option<Vec<DocId>> {
        let (start, end) = match op {
            Operator::Eq(v) => (self.lower(v, true), self.upper(v, true)),
            Operator::Gt(v) | Operator::Gte(v) if is_rangeable(v) => {
                (self.lower(v, matches!(op, Operator::Gte(_))), self.rank_bounds(v).1)
            }
            Operator::Lt(v) | Operator::Lte(v) if is_rangeable(v) => {
                (self.rank_bounds(v).0, self.upper(v, matches!(op, Operator::Lte(_))))
            }
            Operator::Gt(_) | Operator::Gte(_) | Operator::Lt(_) | Operator::Lte(_) => {
                return Some(Vec::new())
            }
            Operator::Between(range) => match range.as_array().map(Vec::as_slice) {
                Some([low, high]) if low.is_number() && high.is_number() => {
                    (self.lower(low, true), self.upper(high, true))
                }
                _ => return Some(Vec::new()),
            },
            _ => return None,
        };
        if start >= end {
            return Some(Vec::new());
        }
        Some(self.entries[start..end].iter().map(|e| e.id).collect())
    }

    /// Verifies ordering and agreement with the stored documents.
    pub fn check(&self, store: &DocStore) -> bool {
        if self.entries.len() != store.len() {
            return false;
        }
        let ordered = self
            .entries
            .windows(2)
            .all(|w| entry_order(&w[0], &w[1].key, w[1].id) == Ordering::Less);
        ordered
            && self.entries.iter().all(|e| {
                store
                    .by_id(e.id)
                    .is_some_and(|doc| compare_values(&key_of(doc, &self.field), &e.key).is_eq())
            })
    }
}

fn is_rangeable(v: &Value) -> bool {
    v.is_number() || v.is_string()
}

/// Canonical hash key for unique lookups. `null` and absent are not indexed.
pub(crate) fn canonical_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::Number(n) => Some(match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

/// Value-to-identity map enforcing at most one document per value.
#[derive(Debug, Clone, Default)]
pub(crate) struct UniqueIndex {
    field: String,
    keys: HashMap<String, DocId>,
}

impl UniqueIndex {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            keys: HashMap::new(),
        }
    }

    /// Builds the index, returning the first duplicated key on conflict.
    pub fn build(field: &str, store: &DocStore) -> Result<Self, String> {
        let mut index = Self::new(field);
        for (id, doc) in store.iter() {
            if let Some(key) = index.key(doc) {
                if index.keys.insert(key.clone(), id).is_some() {
                    return Err(key);
                }
            }
        }
        Ok(index)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn key(&self, doc: &Value) -> Option<String> {
        canonical_key(resolve_path(doc, &self.field))
    }

    pub fn get(&self, value: &Value) -> Option<DocId> {
        canonical_key(Some(value)).and_then(|k| self.keys.get(&k).copied())
    }

    /// Returns the conflicting key if `doc` would collide with a document
    /// other than `own`.
    pub fn conflict(&self, doc: &Value, own: Option<DocId>) -> Option<String> {
        let key = self.key(doc)?;
        match self.keys.get(&key) {
            Some(holder) if Some(*holder) != own => Some(key),
            _ => None,
        }
    }

    pub fn insert(&mut self, doc: &Value, id: DocId) {
        if let Some(key) = self.key(doc) {
            self.keys.insert(key, id);
        }
    }

    pub fn remove(&mut self, doc: &Value, id: DocId) {
        if let Some(key) = self.key(doc) {
            if self.keys.get(&key) == Some(&id) {
                self.keys.remove(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(values: &[Value]) -> DocStore {
        let mut store = DocStore::new();
        for (i, v) in values.iter().enumerate() {
            store.push(i as u64 + 1, v.clone());
        }
        store
    }

    #[test]
    fn binary_index_orders_and_probes() {
        let s = store(&[
            json!({"age": 30}),
            json!({"age": 25}),
            json!({}),
            json!({"age": 30}),
            json!({"age": "x"}),
        ]);
        let index = BinaryIndex::build("age", &s);
        assert!(index.check(&s));
        assert_eq!(index.ordered_ids().collect::<Vec<_>>(), vec![2, 1, 4, 5, 3]);

        assert_eq!(index.probe(&Operator::Eq(json!(30))), Some(vec![1, 4]));
        assert_eq!(index.probe(&Operator::Gt(json!(25))), Some(vec![1, 4]));
        assert_eq!(index.probe(&Operator::Lte(json!(25))), Some(vec![2]));
        assert_eq!(index.probe(&Operator::Eq(Value::Null)), Some(vec![3]));
        assert_eq!(index.probe(&Operator::Between(json!([26, 40]))), Some(vec![1, 4]));
        assert_eq!(index.probe(&Operator::Gt(json!(true))), Some(vec![]));
        assert!(index.probe(&Operator::In(json!([30]))).is_none());
    }

    #[test]
    fn binary_index_maintenance() {
        let mut s = store(&[json!({"n": 2}), json!({"n": 1})]);
        let mut index = BinaryIndex::build("n", &s);

        s.push(3, json!({"n": 0}));
        index.insert(&json!({"n": 0}), 3);
        assert!(index.check(&s));

        let old = s.replace(0, json!({"n": 9}));
        index.update(&old, &json!({"n": 9}), 1);
        assert!(index.check(&s));
        assert_eq!(index.ordered_ids().collect::<Vec<_>>(), vec![3, 2, 1]);

        let removed = s.remove(1);
        index.remove(&removed, 2);
        assert!(index.check(&s));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn canonical_keys_normalize_numbers() {
        assert_eq!(canonical_key(Some(&json!(1))), canonical_key(Some(&json!(1.0))));
        assert_ne!(canonical_key(Some(&json!(1))), canonical_key(Some(&json!("1"))));
        assert_eq!(canonical_key(Some(&Value::Null)), None);
        assert_eq!(canonical_key(None), None);
    }

    #[test]
    fn unique_index_detects_conflicts() {
        let s = store(&[json!({"email": "a@x"}), json!({"email": "b@x"})]);
        let index = UniqueIndex::build("email", &s).unwrap();
        assert_eq!(index.get(&json!("b@x")), Some(2));
        assert!(index.conflict(&json!({"email": "a@x"}), None).is_some());
        assert!(index.conflict(&json!({"email": "a@x"}), Some(1)).is_none());
        assert!(index.conflict(&json!({"email": "c@x"}), None).is_none());
        assert!(index.conflict(&json!({}), None).is_none());

        let dup = store(&[json!({"email": "a"}), json!({"email": "a"})]);
        assert!(UniqueIndex::build("email", &dup).is_err());
    }
}
