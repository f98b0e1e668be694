//! Query engine: fluent plans over an immutable load session.

mod aggregate;
mod executor;
mod filter;
mod plan;
mod result;

pub use filter::{similarity, Predicate};
pub use plan::{Measure, MeasureOp, OrderDirection, QueryBuilder, SortSpec};
pub use result::{Provenance, QueryResult, ResultRow};
