//! Per-request query parameters.
//!
//! A [`QuerySpec`] is the raw mapping parsed from a request's query
//! string. Four keys are reserved for control directives; everything
//! else is a filter field.

use std::collections::BTreeMap;

/// Control keys consumed by the sort, field-selection and pagination
/// transforms. They are never filter predicates.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The effective single value; for repeated keys the last one wins.
    pub fn last(&self) -> Option<&str> {
        match self {
            QueryValue::One(v) => Some(v.as_str()),
            QueryValue::Many(vs) => vs.last().map(|v| v.as_str()),
        }
    }

    /// All values joined with commas (`sort=a&sort=-b` reads as `a,-b`).
    pub fn joined(&self) -> String {
        match self {
            QueryValue::One(v) => v.clone(),
            QueryValue::Many(vs) => vs.join(","),
        }
    }
}

/// The per-request mapping driving filter, sort, selection and paging.
///
/// Keys are unique; pushing a repeated key turns its value into a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    entries: BTreeMap<String, QueryValue>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut spec = Self::new();
        for (k, v) in pairs {
            spec.push(k, v);
        }
        spec
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key: String = key.into();
        let value = value.into();
        let next = match self.entries.remove(&key) {
            Some(QueryValue::One(prev)) => QueryValue::Many(vec![prev, value]),
            Some(QueryValue::Many(mut prev)) => {
                prev.push(value);
                QueryValue::Many(prev)
            }
            None => QueryValue::One(value),
        };
        self.entries.insert(key, next);
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    /// Value of a reserved control key, repeated values joined by commas.
    pub fn control(&self, key: &str) -> Option<String> {
        self.get(key).map(QueryValue::joined)
    }

    /// Non-reserved entries, in key order.
    pub fn filter_entries(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
