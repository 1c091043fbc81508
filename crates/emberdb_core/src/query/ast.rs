//! Compiled query representation and evaluation.

use super::value::{comparable, resolve_path, truthy, type_name, values_equal};
use crate::document::ID_FIELD;
use crate::error::{DbError, DbResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A compiled query.
///
/// Built from a MongoDB-style JSON object with [`Query::parse`] or
/// programmatically with the constructors below. Matching never fails:
/// malformed operands evaluate to false.
#[derive(Debug, Clone)]
pub enum Query {
    /// Matches every document.
    All,
    /// All conditions must hold for the value at `path`.
    Field {
        /// Dot path of the field.
        path: String,
        /// Conditions, ANDed.
        conditions: Vec<Operator>,
    },
    /// Every sub-query must match.
    And(Vec<Query>),
    /// At least one sub-query must match.
    Or(Vec<Query>),
    /// The sub-query must not match.
    Not(Box<Query>),
}

/// A single field condition.
#[derive(Debug, Clone)]
pub enum Operator {
    /// Equal. A `null` operand also matches an absent field.
    Eq(Value),
    /// Not equal.
    Ne(Value),
    /// Greater than, same kind only.
    Gt(Value),
    /// Greater than or equal, same kind only.
    Gte(Value),
    /// Less than, same kind only.
    Lt(Value),
    /// Less than or equal, same kind only.
    Lte(Value),
    /// Equal to one element of the operand array.
    In(Value),
    /// Equal to no element of the operand array.
    Nin(Value),
    /// Inside an inclusive `[low, high]` numeric range.
    Between(Value),
    /// String subject matches the pattern.
    Regex(Regex),
    /// Subject contains every operand element.
    Contains(Value),
    /// Subject contains at least one operand element.
    ContainsAny(Value),
    /// Subject contains none of the operand elements.
    ContainsNone(Value),
    /// Condition on the character length of a string subject.
    Len(Derived),
    /// Condition on the type name of the subject.
    Type(Derived),
    /// Subject is (or is not) a finite number.
    Finite(bool),
    /// Condition on the length of an array subject.
    Size(Derived),
    /// Field is (or is not) present.
    Exists(bool),
    /// Some element of an array subject matches the sub-query.
    ElemMatch(Box<Query>),
}

/// Operand of `$len`, `$size` and `$type`.
#[derive(Debug, Clone)]
pub enum Derived {
    /// The derived value must equal this literal.
    Literal(Value),
    /// The derived value must satisfy these operators.
    Ops(Vec<Operator>),
}

fn is_operator_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn has_operator_key(map: &Map<String, Value>) -> bool {
    map.keys().any(|k| k.starts_with('$'))
}

impl Query {
    /// Compiles a JSON query object.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownOperator`] for an unrecognized `$` key and
    /// [`DbError::InvalidQuery`] for structurally malformed queries.
    pub fn parse(value: &Value) -> DbResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| DbError::invalid_query(format!("query must be an object, got {value}")))?;

        let mut clauses = Vec::with_capacity(map.len());
        for (key, operand) in map {
            clauses.push(match key.as_str() {
                "$and" => Self::And(Self::parse_list(key, operand)?),
                "$or" => Self::Or(Self::parse_list(key, operand)?),
                "$not" => Self::Not(Box::new(Self::parse(operand)?)),
                ID_FIELD => Self::parse_field(key, operand)?,
                k if k.starts_with('$') => return Err(DbError::unknown_operator(k)),
                path => Self::parse_field(path, operand)?,
            });
        }

        Ok(match clauses.len() {
            0 => Self::All,
            1 => clauses.pop().unwrap_or(Self::All),
            _ => Self::And(clauses),
        })
    }

    fn parse_list(key: &str, operand: &Value) -> DbResult<Vec<Self>> {
        operand
            .as_array()
            .ok_or_else(|| DbError::invalid_query(format!("{key} expects an array of queries")))?
            .iter()
            .map(Self::parse)
            .collect()
    }

    fn parse_field(path: &str, operand: &Value) -> DbResult<Self> {
        let conditions = match operand {
            Value::Object(map) if has_operator_key(map) => {
                if map.keys().any(|k| !k.starts_with('$')) {
                    return Err(DbError::invalid_query(format!(
                        "field {path} mixes operators and plain keys"
                    )));
                }
                map.iter()
                    .map(|(k, v)| Operator::parse(k, v))
                    .collect::<DbResult<Vec<_>>>()?
            }
            literal => vec![Operator::Eq(literal.clone())],
        };
        Ok(Self::Field {
            path: path.to_string(),
            conditions,
        })
    }

    /// A query matching every document.
    pub fn all() -> Self {
        Self::All
    }

    /// Equality on one field.
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(path, Operator::Eq(value.into()))
    }

    /// A single operator on one field.
    pub fn field(path: impl Into<String>, op: Operator) -> Self {
        Self::Field {
            path: path.into(),
            conditions: vec![op],
        }
    }

    /// Conjunction.
    pub fn and(queries: Vec<Query>) -> Self {
        Self::And(queries)
    }

    /// Disjunction.
    pub fn or(queries: Vec<Query>) -> Self {
        Self::Or(queries)
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(query: Query) -> Self {
        Self::Not(Box::new(query))
    }

    /// Returns true if the query matches every document.
    pub fn is_all(&self) -> bool {
        match self {
            Self::All => true,
            Self::And(qs) => qs.iter().all(Self::is_all),
            _ => false,
        }
    }

    /// Tests a document against the query.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Field { path, conditions } => {
                let subject = resolve_path(doc, path);
                conditions.iter().all(|op| op.matches(subject))
            }
            Self::And(qs) => qs.iter().all(|q| q.matches(doc)),
            Self::Or(qs) => qs.iter().any(|q| q.matches(doc)),
            Self::Not(q) => !q.matches(doc),
        }
    }

    /// The single field condition an index could serve, if any.
    pub(crate) fn index_probe(&self) -> Option<(&str, &Operator)> {
        match self {
            Self::Field { path, conditions } if conditions.len() == 1 => {
                let op = &conditions[0];
                match op {
                    Operator::Eq(_)
                    | Operator::Gt(_)
                    | Operator::Gte(_)
                    | Operator::Lt(_)
                    | Operator::Lte(_)
                    | Operator::Between(_) => Some((path.as_str(), op)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Converts the query back to its JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::All => Value::Object(Map::new()),
            Self::Field { path, conditions } => {
                let mut ops = Map::new();
                for op in conditions {
                    let (key, operand) = op.to_pair();
                    ops.insert(key.to_string(), operand);
                }
                let mut map = Map::new();
                map.insert(path.clone(), Value::Object(ops));
                Value::Object(map)
            }
            Self::And(qs) => single("$and", Value::Array(qs.iter().map(Self::to_value).collect())),
            Self::Or(qs) => single("$or", Value::Array(qs.iter().map(Self::to_value).collect())),
            Self::Not(q) => single("$not", q.to_value()),
        }
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn compile_regex(pattern: &str, flags: &str) -> DbResult<Regex> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' => inline.push(flag),
            'g' | 'u' => {}
            other => return Err(DbError::invalid_query(format!("unsupported regex flag {other}"))),
        }
    }
    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    Regex::new(&source).map_err(|e| DbError::invalid_query(format!("invalid regex {pattern}: {e}")))
}

fn as_candidates(operand: &Value) -> Vec<&Value> {
    match operand {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    }
}

fn contains_one(subject: &Value, needle: &Value) -> bool {
    match subject {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Object(map) => needle.as_str().is_some_and(|k| map.contains_key(k)),
        _ => false,
    }
}

fn between(subject: &Value, range: &Value) -> bool {
    let Some([low, high]) = range.as_array().map(Vec::as_slice) else {
        return false;
    };
    if !(subject.is_number() && low.is_number() && high.is_number()) {
        return false;
    }
    comparable(subject, low).is_some_and(|o| o != Ordering::Less)
        && comparable(subject, high).is_some_and(|o| o != Ordering::Greater)
}

impl Operator {
    /// Compiles one `$key: operand` pair.
    ///
    /// # Errors
    ///
    /// [`DbError::UnknownOperator`] for unknown keys and
    /// [`DbError::InvalidQuery`] for operands that cannot be compiled.
    pub fn parse(key: &str, operand: &Value) -> DbResult<Self> {
        Ok(match key {
            "$eq" => Self::Eq(operand.clone()),
            "$ne" => Self::Ne(operand.clone()),
            "$gt" => Self::Gt(operand.clone()),
            "$gte" => Self::Gte(operand.clone()),
            "$lt" => Self::Lt(operand.clone()),
            "$lte" => Self::Lte(operand.clone()),
            "$in" => Self::In(operand.clone()),
            "$nin" => Self::Nin(operand.clone()),
            "$between" => Self::Between(operand.clone()),
            "$regex" => Self::Regex(match operand {
                Value::String(pattern) => compile_regex(pattern, "")?,
                Value::Array(parts) => match parts.as_slice() {
                    [Value::String(p)] => compile_regex(p, "")?,
                    [Value::String(p), Value::String(f)] => compile_regex(p, f)?,
                    _ => return Err(DbError::invalid_query("$regex expects [pattern, flags]")),
                },
                _ => return Err(DbError::invalid_query("$regex expects a string pattern")),
            }),
            "$contains" => Self::Contains(operand.clone()),
            "$containsAny" => Self::ContainsAny(operand.clone()),
            "$containsNone" => Self::ContainsNone(operand.clone()),
            "$len" => Self::Len(Derived::parse(operand)?),
            "$type" => Self::Type(Derived::parse(operand)?),
            "$size" => Self::Size(Derived::parse(operand)?),
            "$finite" => Self::Finite(truthy(Some(operand))),
            "$exists" => Self::Exists(truthy(Some(operand))),
            "$elemMatch" => Self::ElemMatch(Box::new(Query::parse(operand)?)),
            other => return Err(DbError::unknown_operator(other)),
        })
    }

    /// Builds a `$regex` operator from a pattern string.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidQuery`] when the pattern does not compile.
    pub fn regex(pattern: &str) -> DbResult<Self> {
        compile_regex(pattern, "").map(Self::Regex)
    }

    /// Evaluates the operator against a resolved field value.
    pub fn matches(&self, subject: Option<&Value>) -> bool {
        match self {
            Self::Eq(Value::Null) => subject.map_or(true, Value::is_null),
            Self::Eq(v) => subject.is_some_and(|s| values_equal(s, v)),
            Self::Ne(Value::Null) => subject.is_some_and(|s| !s.is_null()),
            Self::Ne(v) => !subject.is_some_and(|s| values_equal(s, v)),
            Self::Gt(v) => subject.and_then(|s| comparable(s, v)) == Some(Ordering::Greater),
            Self::Gte(v) => subject
                .and_then(|s| comparable(s, v))
                .is_some_and(|o| o != Ordering::Less),
            Self::Lt(v) => subject.and_then(|s| comparable(s, v)) == Some(Ordering::Less),
            Self::Lte(v) => subject
                .and_then(|s| comparable(s, v))
                .is_some_and(|o| o != Ordering::Greater),
            Self::In(list) => match list {
                Value::Array(items) => {
                    let s = subject.unwrap_or(&Value::Null);
                    items.iter().any(|i| values_equal(s, i))
                }
                _ => false,
            },
            Self::Nin(list) => match list {
                Value::Array(items) => {
                    let s = subject.unwrap_or(&Value::Null);
                    !items.iter().any(|i| values_equal(s, i))
                }
                _ => true,
            },
            Self::Between(range) => subject.is_some_and(|s| between(s, range)),
            Self::Regex(re) => subject
                .and_then(Value::as_str)
                .is_some_and(|s| re.is_match(s)),
            Self::Contains(needles) => subject.is_some_and(|s| {
                as_candidates(needles).into_iter().all(|n| contains_one(s, n))
            }),
            Self::ContainsAny(needles) => subject.is_some_and(|s| {
                as_candidates(needles).into_iter().any(|n| contains_one(s, n))
            }),
            Self::ContainsNone(needles) => subject.map_or(true, |s| {
                !as_candidates(needles).into_iter().any(|n| contains_one(s, n))
            }),
            Self::Len(d) => match subject {
                Some(Value::String(s)) => d.matches(&Value::from(s.chars().count())),
                _ => false,
            },
            Self::Size(d) => match subject {
                Some(Value::Array(items)) => d.matches(&Value::from(items.len())),
                _ => false,
            },
            Self::Type(d) => d.matches(&Value::from(type_name(subject))),
            Self::Finite(expected) => {
                let finite = match subject {
                    Some(Value::Number(n)) => n.as_f64().is_some_and(f64::is_finite),
                    Some(Value::String(s)) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
                    _ => false,
                };
                finite == *expected
            }
            Self::Exists(expected) => subject.is_some() == *expected,
            Self::ElemMatch(q) => match subject {
                Some(Value::Array(items)) => items.iter().any(|item| q.matches(item)),
                _ => false,
            },
        }
    }

    fn to_pair(&self) -> (&'static str, Value) {
        match self {
            Self::Eq(v) => ("$eq", v.clone()),
            Self::Ne(v) => ("$ne", v.clone()),
            Self::Gt(v) => ("$gt", v.clone()),
            Self::Gte(v) => ("$gte", v.clone()),
            Self::Lt(v) => ("$lt", v.clone()),
            Self::Lte(v) => ("$lte", v.clone()),
            Self::In(v) => ("$in", v.clone()),
            Self::Nin(v) => ("$nin", v.clone()),
            Self::Between(v) => ("$between", v.clone()),
            Self::Regex(re) => ("$regex", Value::from(re.as_str())),
            Self::Contains(v) => ("$contains", v.clone()),
            Self::ContainsAny(v) => ("$containsAny", v.clone()),
            Self::ContainsNone(v) => ("$containsNone", v.clone()),
            Self::Len(d) => ("$len", d.to_value()),
            Self::Type(d) => ("$type", d.to_value()),
            Self::Size(d) => ("$size", d.to_value()),
            Self::Finite(b) => ("$finite", Value::Bool(*b)),
            Self::Exists(b) => ("$exists", Value::Bool(*b)),
            Self::ElemMatch(q) => ("$elemMatch", q.to_value()),
        }
    }
}

impl Derived {
    fn parse(operand: &Value) -> DbResult<Self> {
        match is_operator_object(operand) {
            Some(map) => map
                .iter()
                .map(|(k, v)| Operator::parse(k, v))
                .collect::<DbResult<Vec<_>>>()
                .map(Self::Ops),
            None => Ok(Self::Literal(operand.clone())),
        }
    }

    fn matches(&self, derived: &Value) -> bool {
        match self {
            Self::Literal(v) => values_equal(derived, v),
            Self::Ops(ops) => ops.iter().all(|op| op.matches(Some(derived))),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Ops(ops) => Value::Object(
                ops.iter()
                    .map(|op| {
                        let (k, v) = op.to_pair();
                        (k.to_string(), v)
                    })
                    .collect(),
            ),
        }
    }
}
