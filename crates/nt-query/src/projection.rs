//! # Field Projection
//!
//! `fields=name,price` keeps only those fields, `fields=-description`
//! drops one. Without `fields`, only the internal version counter is hidden.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::QueryParameters;

/// Document version counter maintained by the store.
pub const VERSION_FIELD: &str = "__v";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ProjectionSpec {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: fields.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Vec::new(),
            exclude: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated field list; `-` prefix means exclusion.
    /// Duplicates are dropped. Returns `None` when no usable token is present.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut spec = Self {
            include: Vec::new(),
            exclude: Vec::new(),
        };

        for token in raw.split(',').map(str::trim) {
            let (set, field) = match token.strip_prefix('-') {
                Some(field) => (&mut spec.exclude, field),
                None => (&mut spec.include, token),
            };
            if !field.is_empty() && !set.iter().any(|f| f == field) {
                set.push(field.to_string());
            }
        }

        if spec.is_empty() {
            None
        } else {
            Some(spec)
        }
    }

    /// The `fields` parameter, or the default projection.
    pub fn from_params(params: &QueryParameters) -> Self {
        params
            .get_str("fields")
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

impl Default for ProjectionSpec {
    fn default() -> Self {
        Self::exclude([VERSION_FIELD])
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let included = self.include.iter().map(String::from);
        let excluded = self.exclude.iter().map(|field| format!("-{}", field));
        let all: Vec<String> = included.chain(excluded).collect();
        f.write_str(&all.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusion_set() {
        let p = ProjectionSpec::from_params(&QueryParameters::parse("fields=name,price"));
        assert_eq!(p, ProjectionSpec::include(["name", "price"]));
        assert_eq!(p.to_string(), "name price");
    }

    #[test]
    fn test_default_hides_version_field() {
        let p = ProjectionSpec::from_params(&QueryParameters::new());
        assert!(p.include.is_empty());
        assert_eq!(p.exclude, vec!["__v".to_string()]);
        assert_eq!(p.to_string(), "-__v");
    }

    #[test]
    fn test_exclusion_tokens() {
        let p = ProjectionSpec::parse("-description,-images,-description").unwrap();
        assert_eq!(p, ProjectionSpec::exclude(["description", "images"]));
    }

    #[test]
    fn test_blank_fields_falls_back_to_default() {
        let p = ProjectionSpec::from_params(&QueryParameters::parse("fields=,,"));
        assert_eq!(p, ProjectionSpec::default());
    }
}
