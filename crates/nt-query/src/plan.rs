//! # Query Plan
//!
//! A plain, serializable [`QueryHandle`] that just records each stage.
//! Stores that execute lazily wrap one of these; tools that only want to
//! see what a query string means print it.

use serde::{Deserialize, Serialize};

use crate::filter::FilterExpression;
use crate::projection::ProjectionSpec;
use crate::sort::SortSpec;
use crate::QueryHandle;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub filter: FilterExpression,
    pub sort: Option<SortSpec>,
    pub projection: Option<ProjectionSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryHandle for QueryPlan {
    fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter.merge(filter);
        self
    }

    fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    fn with_projection(mut self, projection: ProjectionSpec) -> Self {
        self.projection = Some(projection);
        self
    }

    fn with_skip_limit(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}
