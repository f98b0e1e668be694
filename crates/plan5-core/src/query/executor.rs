//! Plan validation and fixed-order execution.
//!
//! Every referenced field, relation, and pagination argument is checked
//! against the catalog before any data is touched, so a malformed plan
//! never returns a partial result. Execution then runs
//! filter -> join -> aggregate -> sort -> paginate; `limit` counts
//! post-aggregation rows.

use std::cmp::Ordering;

use tracing::debug;

use super::aggregate::aggregate_rows;
use super::plan::{OrderDirection, QueryBuilder};
use super::result::{Provenance, QueryResult, ResultRow};
use crate::error::{DependencyError, Error, QueryError};
use crate::value::{IndexKey, Value};

impl QueryBuilder<'_> {
    /// Validate and run the accumulated plan.
    pub fn execute(self) -> Result<QueryResult, Error> {
        self.validate()?;

        let base = self.session.table(&self.table)?;
        let mut operations = Vec::new();

        // Filter.
        let mut rows: Vec<ResultRow> = base
            .records
            .iter()
            .filter(|record| self.predicates.iter().all(|p| p.matches(record)))
            .map(|record| ResultRow {
                base: record.clone(),
                joined: Vec::new(),
            })
            .collect();
        for predicate in &self.predicates {
            operations.push(format!("filter {predicate}"));
        }

        // Joins, in declaration order of the builder.
        for relation_name in &self.joins {
            rows = self.apply_join(relation_name, rows)?;
            operations.push(format!("join {relation_name}"));
        }

        // Aggregation.
        if self.is_aggregated() {
            rows = aggregate_rows(&self.table, rows, &self.group_by, &self.measures);
            operations.push(format!(
                "aggregate by [{}] into {} measure(s)",
                self.group_by.join(", "),
                self.measures.len()
            ));
        }

        // Sort (stable; ties keep record-identifier order).
        if let Some(sort) = &self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_for_sort(a.get(&sort.field), b.get(&sort.field));
                match sort.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            });
            operations.push(format!(
                "sort {} {}",
                sort.field,
                match sort.direction {
                    OrderDirection::Asc => "asc",
                    OrderDirection::Desc => "desc",
                }
            ));
        }

        // Pagination, counted over post-aggregation rows.
        if self.offset > 0 || self.limit.is_some() {
            let offset = self.offset as usize;
            let limit = self
                .limit
                .map(|l| l as usize)
                .unwrap_or(usize::MAX);
            rows = rows.into_iter().skip(offset).take(limit).collect();
            operations.push(match self.limit {
                Some(limit) => format!("offset {} limit {limit}", self.offset),
                None => format!("offset {}", self.offset),
            });
        }

        debug!(table = %self.table, rows = rows.len(), "query executed");

        Ok(QueryResult::new(
            rows,
            Provenance {
                table: self.table.clone(),
                operations,
            },
        ))
    }

    /// Reject the plan before touching any data.
    fn validate(&self) -> Result<(), Error> {
        let catalog = self.session.catalog();

        // An undeclared base table is a dependency problem, not a plan
        // problem: the caller asked for a table the catalog never knew.
        if !catalog.contains(&self.table) {
            return Err(DependencyError::UnknownTable(self.table.clone()).into());
        }
        let def = catalog.resolve(&self.table)?;

        for predicate in &self.predicates {
            if def.field(predicate.field()).is_none() {
                return Err(QueryError::UnknownField {
                    table: self.table.clone(),
                    field: predicate.field().to_string(),
                }
                .into());
            }
        }

        for relation_name in &self.joins {
            let relation = catalog
                .relation(relation_name)
                .map_err(|_| QueryError::UnknownRelation(relation_name.clone()))?;
            if !relation.touches(&self.table) {
                return Err(QueryError::UnrelatedJoin {
                    relation: relation_name.clone(),
                    table: self.table.clone(),
                }
                .into());
            }
            if !self.session.indexes().is_resolved(relation_name) {
                let other = relation
                    .other_side(&self.table)
                    .unwrap_or(relation_name)
                    .to_string();
                return Err(DependencyError::Unavailable {
                    name: other,
                    reason: format!("relation {relation_name} unresolved in this session"),
                }
                .into());
            }
        }

        for field in &self.group_by {
            if def.field(field).is_none() {
                return Err(QueryError::UnknownField {
                    table: self.table.clone(),
                    field: field.clone(),
                }
                .into());
            }
        }
        let mut measure_names = Vec::new();
        for measure in &self.measures {
            if let Some(field) = &measure.field {
                if def.field(field).is_none() {
                    return Err(QueryError::UnknownField {
                        table: self.table.clone(),
                        field: field.clone(),
                    }
                    .into());
                }
            } else if measure.op != super::plan::MeasureOp::Count {
                return Err(QueryError::InvalidAggregation(format!(
                    "measure {} requires a field",
                    measure.name
                ))
                .into());
            }
            if measure_names.contains(&measure.name) || self.group_by.contains(&measure.name) {
                return Err(QueryError::InvalidAggregation(format!(
                    "duplicate output name {}",
                    measure.name
                ))
                .into());
            }
            measure_names.push(measure.name.clone());
        }

        if let Some(sort) = &self.sort {
            let known = if self.is_aggregated() {
                self.group_by.contains(&sort.field) || measure_names.contains(&sort.field)
            } else {
                def.field(&sort.field).is_some()
            };
            if !known {
                return Err(QueryError::UnknownField {
                    table: self.table.clone(),
                    field: sort.field.clone(),
                }
                .into());
            }
        }

        if self.offset < 0 {
            return Err(
                QueryError::InvalidPagination(format!("offset {} is negative", self.offset)).into(),
            );
        }
        if let Some(limit) = self.limit {
            if limit < 0 {
                return Err(
                    QueryError::InvalidPagination(format!("limit {limit} is negative")).into(),
                );
            }
        }

        Ok(())
    }

    /// Expand rows through one relation via its hash index (inner join).
    fn apply_join(
        &self,
        relation_name: &str,
        rows: Vec<ResultRow>,
    ) -> Result<Vec<ResultRow>, Error> {
        let catalog = self.session.catalog();
        let relation = catalog.relation(relation_name)?;
        let index = self
            .session
            .indexes()
            .get(relation_name)
            .ok_or_else(|| DependencyError::Unavailable {
                name: relation_name.to_string(),
                reason: "relation unresolved in this session".to_string(),
            })?;

        let (fk_table, fk_field) = relation.fk_side();
        let (_, key_field) = relation.key_side();

        // Probing direction depends on which side of the relation the base
        // table is. A self-relation treats the base as the key side.
        let base_is_key_side = relation.key_side().0 == self.table;
        let (target_name, probe_field) = if base_is_key_side {
            (index.fk_table(), key_field)
        } else {
            (index.key_table(), fk_field)
        };
        let target = self.session.table(target_name)?;

        let mut expanded = Vec::new();
        for row in rows {
            let Some(key) = row.base.get(probe_field).and_then(IndexKey::from_value) else {
                continue; // null key: no match, inner join drops the row
            };
            let positions = if base_is_key_side {
                index.lookup(&key)
            } else {
                index.lookup_key_side(&key)
            };
            for &position in positions {
                if let Some(record) = target.record(position) {
                    let mut joined_row = row.clone();
                    joined_row
                        .joined
                        .push((relation_name.to_string(), record.clone()));
                    expanded.push(joined_row);
                }
            }
        }

        debug!(
            relation = relation_name,
            fk_table,
            rows = expanded.len(),
            "join applied"
        );
        Ok(expanded)
    }
}

/// Sort comparator: nulls and absent values order last (ascending).
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}
