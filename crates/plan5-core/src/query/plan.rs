//! Fluent query builder.
//!
//! The builder only accumulates; execution order is fixed by the engine
//! (filter -> join -> aggregate -> sort -> paginate) regardless of the call
//! order, so plans composed in different orders return identical results.

use super::filter::Predicate;
use crate::registry::LoadSession;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Sort key with direction. Ties keep record-identifier order.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: OrderDirection,
}

/// Aggregation function of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// A named aggregation measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Output field name of the measure.
    pub name: String,
    /// Aggregation function.
    pub op: MeasureOp,
    /// Input field; `None` only for `count`.
    pub field: Option<String>,
}

impl Measure {
    /// Count rows per group.
    pub fn count(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Count,
            field: None,
        }
    }

    /// Count non-null values of a field per group.
    pub fn count_field(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Count,
            field: Some(field.into()),
        }
    }

    /// Sum a numeric field per group.
    pub fn sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Sum,
            field: Some(field.into()),
        }
    }

    /// Average a numeric field per group.
    pub fn avg(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Avg,
            field: Some(field.into()),
        }
    }

    /// Minimum of a field per group.
    pub fn min(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Min,
            field: Some(field.into()),
        }
    }

    /// Maximum of a field per group.
    pub fn max(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MeasureOp::Max,
            field: Some(field.into()),
        }
    }
}

/// Accumulates a query plan against one load session.
///
/// ```no_run
/// # use plan5_core::catalog::Catalog;
/// # use plan5_core::query::{OrderDirection, Predicate};
/// # use plan5_core::registry::Registry;
/// # use std::sync::Arc;
/// # let registry = Registry::new(Arc::new(Catalog::standard()));
/// # let session = registry.load_all("archive/").unwrap();
/// let result = session
///     .query("5EMPL")
///     .filter(Predicate::contains("name", "Muster"))
///     .join("employee_absences")
///     .order_by("name", OrderDirection::Asc)
///     .limit(20)
///     .execute()?;
/// # Ok::<(), plan5_core::error::Error>(())
/// ```
pub struct QueryBuilder<'s> {
    pub(super) session: &'s LoadSession,
    pub(super) table: String,
    pub(super) predicates: Vec<Predicate>,
    pub(super) joins: Vec<String>,
    pub(super) sort: Option<SortSpec>,
    pub(super) offset: i64,
    pub(super) limit: Option<i64>,
    pub(super) group_by: Vec<String>,
    pub(super) measures: Vec<Measure>,
}

impl<'s> QueryBuilder<'s> {
    pub(crate) fn new(session: &'s LoadSession, table: String) -> Self {
        Self {
            session,
            table,
            predicates: Vec::new(),
            joins: Vec::new(),
            sort: None,
            offset: 0,
            limit: None,
            group_by: Vec::new(),
            measures: Vec::new(),
        }
    }

    /// Add a filter predicate; all predicates must match.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Join a declared relation by name (inner semantics: base rows
    /// without a match are dropped).
    pub fn join(mut self, relation: impl Into<String>) -> Self {
        self.joins.push(relation.into());
        self
    }

    /// Sort by a field. On aggregated queries the field names a group key
    /// or measure.
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    /// Skip the first `offset` result rows. Negative values are rejected
    /// at execution.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Cap the number of result rows. Counts post-aggregation rows.
    /// Negative values are rejected at execution.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Group result rows by the given base-table fields.
    pub fn group_by(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add an aggregation measure.
    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub(super) fn is_aggregated(&self) -> bool {
        !self.group_by.is_empty() || !self.measures.is_empty()
    }
}
