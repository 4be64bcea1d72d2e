//! # Find
//!
//! Lazily executed read query. Stages are recorded on a [`QueryPlan`] and
//! only evaluated by [`Find::exec`]:
//!
//! filter → sort → skip/limit → projection

use std::time::Instant;

use nt_query::{FilterExpression, ProjectionSpec, QueryHandle, QueryPlan, SortSpec};

use crate::collection::Collection;
use crate::{eval, Document, StoreError};

pub struct Find {
    collection: Collection,
    plan: QueryPlan,
}

impl Find {
    pub(crate) fn new(collection: Collection, plan: QueryPlan) -> Self {
        Self { collection, plan }
    }

    /// Run the query. An unrecognised filter operator fails the whole query;
    /// a window past the end of the results is simply empty.
    pub async fn exec(self) -> Result<Vec<Document>, StoreError> {
        let start = Instant::now();
        let plan = self.plan;
        eval::validate(&plan.filter)?;

        let docs = self.collection.docs.read().await;
        let mut matched: Vec<&Document> = docs
            .iter()
            .filter(|d| eval::matches(d, &plan.filter))
            .collect();

        if let Some(sort) = &plan.sort {
            // Stable: ties keep insertion order
            matched.sort_by(|a, b| eval::compare_documents(a, b, sort));
        }

        let skip = usize::try_from(plan.skip).unwrap_or(usize::MAX);
        let limit = plan
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let results: Vec<Document> = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| eval::project(d, plan.projection.as_ref()))
            .collect();

        tracing::debug!(
            collection = %self.collection.name(),
            filter = %plan.filter,
            results = results.len(),
            "query took {} ms",
            start.elapsed().as_millis()
        );

        Ok(results)
    }
}

impl QueryHandle for Find {
    fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.plan = self.plan.with_filter(filter);
        self
    }

    fn with_sort(mut self, sort: SortSpec) -> Self {
        self.plan = self.plan.with_sort(sort);
        self
    }

    fn with_projection(mut self, projection: ProjectionSpec) -> Self {
        self.plan = self.plan.with_projection(projection);
        self
    }

    fn with_skip_limit(mut self, skip: u64, limit: u64) -> Self {
        self.plan = self.plan.with_skip_limit(skip, limit);
        self
    }
}
