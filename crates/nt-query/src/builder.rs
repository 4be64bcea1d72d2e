//! # List Query Builder
//!
//! Applies the query string to a [`QueryHandle`] in four stages. Call them
//! in pipeline order (`filter → sort → limit_fields → paginate`); each stage
//! works on the handle the previous one produced.
//!
//! ```
//! use nt_query::{ListQueryBuilder, QueryParameters, QueryPlan};
//!
//! let params = QueryParameters::parse("difficulty=easy&sort=-price&page=2&limit=10");
//! let plan = ListQueryBuilder::new(QueryPlan::new(), params)
//!     .filter()
//!     .sort()
//!     .limit_fields()
//!     .paginate()
//!     .into_query();
//! assert_eq!(plan.skip, 10);
//! ```

use crate::filter::FilterExpression;
use crate::page::PageSpec;
use crate::params::QueryParameters;
use crate::projection::ProjectionSpec;
use crate::sort::SortSpec;
use crate::QueryHandle;

/// Per-request, resource-agnostic list query builder.
#[derive(Debug, Clone)]
pub struct ListQueryBuilder<H> {
    query: H,
    params: QueryParameters,
}

impl<H: QueryHandle> ListQueryBuilder<H> {
    pub fn new(query: H, params: QueryParameters) -> Self {
        Self { query, params }
    }

    /// Equality and range predicates from every non-control parameter.
    pub fn filter(mut self) -> Self {
        let filter = FilterExpression::from_params(&self.params);
        tracing::debug!(filter = %filter, "list query: filter");
        self.query = self.query.with_filter(filter);
        self
    }

    /// `sort` parameter, default newest first.
    pub fn sort(mut self) -> Self {
        let sort = SortSpec::from_params(&self.params);
        tracing::debug!(sort = %sort, "list query: sort");
        self.query = self.query.with_sort(sort);
        self
    }

    /// `fields` parameter, default hides the version field.
    pub fn limit_fields(mut self) -> Self {
        let projection = ProjectionSpec::from_params(&self.params);
        tracing::debug!(projection = %projection, "list query: fields");
        self.query = self.query.with_projection(projection);
        self
    }

    /// `page` / `limit` parameters, default page 1 of 100.
    pub fn paginate(mut self) -> Self {
        let page = PageSpec::from_params(&self.params);
        tracing::debug!(page = page.page, limit = page.limit, "list query: paginate");
        self.query = self.query.with_skip_limit(page.skip(), page.limit);
        self
    }

    /// All four stages in pipeline order.
    pub fn apply_all(self) -> Self {
        self.filter().sort().limit_fields().paginate()
    }

    pub fn into_query(self) -> H {
        self.query
    }
}
