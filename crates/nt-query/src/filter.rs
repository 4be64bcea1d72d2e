//! # Filter Expressions
//!
//! Everything in the query string that is not a control key is a predicate
//! on a document field. Bracketed keys carrying one of the four comparison
//! suffixes become range predicates, everything else is equality.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::{ParamValue, QueryParameters};

/// Keys that shape the query instead of filtering it.
pub const CONTROL_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Range comparison recognised in `field[op]=value` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Gte,
    Gt,
    Lte,
    Lt,
}

impl ComparisonOperator {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gte" => Some(Self::Gte),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "lt" => Some(Self::Lt),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Lt => "lt",
        }
    }

    /// Operator name understood by the document store.
    pub fn store_operator(self) -> &'static str {
        match self {
            Self::Gte => "$gte",
            Self::Gt => "$gt",
            Self::Lte => "$lte",
            Self::Lt => "$lt",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A boolean condition on one document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Eq {
        field: String,
        value: String,
    },
    /// Field equals any of the values (repeated query-string key).
    In {
        field: String,
        values: Vec<String>,
    },
    Range {
        field: String,
        op: ComparisonOperator,
        value: String,
    },
    /// Never produced from a query string; used by callers that scope a
    /// collection (e.g. hiding flagged documents).
    Ne {
        field: String,
        value: String,
    },
    /// Bracket suffix outside the recognised four. Passed through untouched
    /// for the store to accept or reject.
    Unrecognized {
        field: String,
        operator: String,
        value: ParamValue,
    },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(
        field: impl Into<String>,
        op: ComparisonOperator,
        value: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::In { field, .. }
            | Self::Range { field, .. }
            | Self::Ne { field, .. }
            | Self::Unrecognized { field, .. } => field,
        }
    }
}

/// Conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    predicates: Vec<Predicate>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate every non-control parameter into a predicate.
    pub fn from_params(params: &QueryParameters) -> Self {
        let mut filter = Self::new();

        for (field, value) in params {
            if CONTROL_KEYS.contains(&field.as_str()) {
                continue;
            }

            match value {
                ParamValue::Single(v) => filter.push(Predicate::eq(field, v)),
                ParamValue::List(values) => filter.push(Predicate::In {
                    field: field.clone(),
                    values: values.clone(),
                }),
                ParamValue::Nested(ops) => {
                    for (op, v) in ops {
                        let predicate = match (ComparisonOperator::from_suffix(op), v.last()) {
                            (Some(op), Some(bound)) => Predicate::range(field, op, bound),
                            _ => Predicate::Unrecognized {
                                field: field.clone(),
                                operator: op.clone(),
                                value: v.clone(),
                            },
                        };
                        filter.push(predicate);
                    }
                }
            }
        }

        filter
    }

    /// Builder-style `AND`.
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.push(predicate);
        self
    }

    /// Add a predicate unless an identical one is already present.
    pub fn push(&mut self, predicate: Predicate) {
        if !self.predicates.contains(&predicate) {
            self.predicates.push(predicate);
        }
    }

    /// Fold another conjunction into this one. Re-applying the same filter
    /// leaves the expression unchanged.
    pub fn merge(&mut self, other: FilterExpression) {
        for predicate in other.predicates {
            self.push(predicate);
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Render as a Mongo-style query document, e.g.
    /// `{"price": {"$gte": "100"}, "difficulty": "easy"}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();

        for predicate in &self.predicates {
            let (field, clause) = match predicate {
                Predicate::Eq { field, value } => (field, Value::String(value.clone())),
                Predicate::In { field, values } => {
                    (field, serde_json::json!({ "$in": values }))
                }
                Predicate::Range { field, op, value } => {
                    (field, serde_json::json!({ (op.store_operator()): value }))
                }
                Predicate::Ne { field, value } => (field, serde_json::json!({ "$ne": value })),
                Predicate::Unrecognized {
                    field,
                    operator,
                    value,
                } => (field, serde_json::json!({ (operator.as_str()): value })),
            };

            match doc.get_mut(field.as_str()) {
                Some(Value::Object(existing)) if clause.is_object() => {
                    if let Value::Object(more) = clause {
                        existing.extend(more);
                    }
                }
                _ => {
                    doc.insert(field.clone(), clause);
                }
            }
        }

        Value::Object(doc)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}
