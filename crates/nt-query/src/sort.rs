//! # Sort Specification
//!
//! `sort=-price,name` → `[(price, desc), (name, asc)]`, left-to-right priority.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::QueryParameters;

/// Field every list is ordered by when the client names none (newest first).
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered sort keys. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    /// Parse a comma-separated list; `-` prefix means descending.
    /// Returns `None` when no usable token is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let keys: Vec<SortKey> = raw
            .split(',')
            .map(str::trim)
            .filter_map(|token| match token.strip_prefix('-') {
                Some(field) if !field.is_empty() => Some(SortKey::desc(field)),
                Some(_) => None,
                None if !token.is_empty() => Some(SortKey::asc(token)),
                None => None,
            })
            .collect();

        if keys.is_empty() {
            None
        } else {
            Some(Self(keys))
        }
    }

    /// The `sort` parameter, or the default ordering.
    pub fn from_params(params: &QueryParameters) -> Self {
        params
            .get_str("sort")
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self(vec![SortKey::desc(DEFAULT_SORT_FIELD)])
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if key.direction == SortDirection::Desc {
                f.write_str("-")?;
            }
            f.write_str(&key.field)?;
        }
        Ok(())
    }
}
