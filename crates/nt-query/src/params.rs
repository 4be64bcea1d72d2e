//! # Query Parameters
//!
//! The raw mapping received from an HTTP query string. Keys written with
//! bracket syntax (`price[gte]=100`) become nested values, repeated keys
//! (`tag=a&tag=b`) become lists.

use std::collections::btree_map::{self, BTreeMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `base[seg][seg]…` where no segment contains another bracket.
static BRACKET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)((?:\[[^\[\]]*\])+)$").unwrap());

static BRACKET_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

/// A single query-string value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
    Nested(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Scalar view of the value. Lists resolve to their last element,
    /// nested values have no scalar view.
    pub fn last(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(values) => values.last().map(String::as_str),
            Self::Nested(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::List(vec![first, value]);
            }
            Self::List(values) => values.push(value),
            // A plain value after a bracketed one: last shape wins.
            Self::Nested(_) => *self = Self::Single(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

/// Mapping from parameter name to value, as received from the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParameters(BTreeMap<String, ParamValue>);

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    /// A leading `?` is tolerated.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        Self::from_pairs(url::form_urlencoded::parse(raw.as_bytes()))
    }

    /// Group already-decoded key/value pairs.
    ///
    /// - `a=1&a=2` → `a: List["1", "2"]`
    /// - `a[]=1` → `a: Single("1")` (further `a[]` entries extend the list)
    /// - `price[gte]=1&price[lte]=9` → `price: Nested{gte: "1", lte: "9"}`
    ///
    /// Keys whose brackets don't balance are kept verbatim.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let path = split_key(key);
            if path.is_empty() {
                continue;
            }
            insert_path(&mut params.0, &path, value.into());
        }
        params
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Scalar value of `key`, see [`ParamValue::last`].
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParamValue::last)
    }

    /// Set `key`, replacing whatever the client sent.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a QueryParameters {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Split `price[gte]` into `["price", "gte"]`. A trailing `[]` marks an
/// array append and is dropped.
fn split_key(key: &str) -> Vec<&str> {
    let Some(caps) = BRACKET_KEY.captures(key) else {
        return if key.is_empty() { Vec::new() } else { vec![key] };
    };

    let (Some(base), Some(brackets)) = (caps.get(1), caps.get(2)) else {
        return vec![key];
    };

    let mut path = vec![base.as_str()];
    for segment in BRACKET_SEGMENT.captures_iter(brackets.as_str()) {
        match segment.get(1).map(|m| m.as_str()) {
            Some("") | None => {}
            Some(name) => path.push(name),
        }
    }
    path
}

fn insert_path(map: &mut BTreeMap<String, ParamValue>, path: &[&str], value: String) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match map.get_mut(*head) {
            Some(existing) => existing.push(value),
            None => {
                map.insert(head.to_string(), ParamValue::Single(value));
            }
        }
        return;
    }

    let entry = map
        .entry(head.to_string())
        .or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
    if !matches!(entry, ParamValue::Nested(_)) {
        *entry = ParamValue::Nested(BTreeMap::new());
    }
    if let ParamValue::Nested(inner) = entry {
        insert_path(inner, rest, value);
    }
}
