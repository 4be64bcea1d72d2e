//! # nt-query — The "Shape" of Natours
//!
//! Turns the key/value mapping of an HTTP query string into a fully specified
//! read query: filter, sort, field projection and pagination.
//!
//! The store is never touched here. A [`ListQueryBuilder`] wraps any value
//! implementing [`QueryHandle`] and feeds it the four query stages in order:
//!
//! ```text
//! ?difficulty=easy&price[gte]=100&sort=-price,name&fields=name,price&page=2&limit=10
//!        │                 │           │                 │              │
//!     filter()          filter()     sort()        limit_fields()   paginate()
//! ```

pub mod builder;
pub mod filter;
pub mod page;
pub mod params;
pub mod plan;
pub mod projection;
pub mod sort;

pub use builder::ListQueryBuilder;
pub use filter::{ComparisonOperator, FilterExpression, Predicate, CONTROL_KEYS};
pub use page::PageSpec;
pub use params::{ParamValue, QueryParameters};
pub use plan::QueryPlan;
pub use projection::{ProjectionSpec, VERSION_FIELD};
pub use sort::{SortDirection, SortKey, SortSpec};

/// Capability contract of an in-progress read query.
///
/// Every method consumes the handle and returns the updated one, so stages
/// compose by plain chaining. Implementors decide how a stage is recorded;
/// the builder only guarantees the order in which they are applied.
pub trait QueryHandle: Sized {
    /// Restrict the result set to documents matching every predicate.
    fn with_filter(self, filter: FilterExpression) -> Self;

    /// Order the result set, first key has highest priority.
    fn with_sort(self, sort: SortSpec) -> Self;

    /// Choose which fields of each document are returned.
    fn with_projection(self, projection: ProjectionSpec) -> Self;

    /// Window the ordered result set.
    fn with_skip_limit(self, skip: u64, limit: u64) -> Self;
}
