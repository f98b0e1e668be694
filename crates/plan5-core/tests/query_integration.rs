//! Integration tests for the query engine.

mod common;

use std::sync::Arc;

use plan5_core::error::{DependencyError, Error, QueryError};
use plan5_core::query::{Measure, OrderDirection, Predicate};
use plan5_core::registry::{LoadSession, Registry};
use plan5_core::value::Value;

use common::*;

struct TestContext {
    session: LoadSession,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_archive(dir.path());
        let registry = Registry::new(Arc::new(test_catalog()));
        let session = registry.load_all(dir.path()).unwrap();
        Self { session, _dir: dir }
    }
}

#[test]
fn test_filter_only() {
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::eq("id", 2i64))
        .execute()
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(
        result.rows()[0].get("name"),
        Some(&Value::Text("Beispiel".into()))
    );
}

#[test]
fn test_join_expands_to_matching_rows() {
    // Employees joined to absences, filtered to name contains "Muster":
    // exactly the two absences of employee 1.
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::contains("name", "Muster"))
        .join("employee_absences")
        .execute()
        .unwrap();

    assert_eq!(result.len(), 2);
    for row in &result {
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        let absence = row.joined_record("employee_absences").unwrap();
        assert_eq!(absence.get("employee_id"), Some(&Value::Int(1)));
    }
    let absence_ids: Vec<_> = result
        .iter()
        .map(|row| {
            row.joined_record("employee_absences")
                .unwrap()
                .get("id")
                .cloned()
        })
        .collect();
    assert_eq!(absence_ids, vec![Some(Value::Int(10)), Some(Value::Int(11))]);
}

#[test]
fn test_inner_join_drops_unmatched_rows() {
    let ctx = TestContext::new();
    // Employee 2 has exactly one absence; an employee without absences
    // would not appear at all.
    let result = ctx
        .session
        .query("5EMPL")
        .join("employee_absences")
        .execute()
        .unwrap();
    assert_eq!(result.len(), 3);
}

#[test]
fn test_join_from_foreign_key_side() {
    // Base on the "many" side: each absence finds its employee.
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5ABSEN")
        .filter(Predicate::eq("id", 12i64))
        .join("employee_absences")
        .execute()
        .unwrap();

    assert_eq!(result.len(), 1);
    let employee = result.rows()[0].joined_record("employee_absences").unwrap();
    assert_eq!(employee.get("name"), Some(&Value::Text("Beispiel".into())));
}

#[test]
fn test_builder_order_does_not_change_results() {
    let ctx = TestContext::new();

    let a = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::contains("name", "Muster"))
        .join("employee_absences")
        .order_by("id", OrderDirection::Asc)
        .offset(0)
        .limit(10)
        .execute()
        .unwrap();

    let b = ctx
        .session
        .query("5EMPL")
        .limit(10)
        .order_by("id", OrderDirection::Asc)
        .join("employee_absences")
        .offset(0)
        .filter(Predicate::contains("name", "Muster"))
        .execute()
        .unwrap();

    assert_eq!(a.rows(), b.rows());
}

#[test]
fn test_sort_directions_and_stability() {
    let ctx = TestContext::new();

    let asc = ctx
        .session
        .query("5EMPL")
        .order_by("name", OrderDirection::Asc)
        .execute()
        .unwrap();
    let names: Vec<_> = asc.iter().map(|r| r.get("name").cloned().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            Value::Text("Beispiel".into()),
            Value::Text("Mustermann".into())
        ]
    );

    let desc = ctx
        .session
        .query("5EMPL")
        .order_by("name", OrderDirection::Desc)
        .execute()
        .unwrap();
    assert_eq!(
        desc.rows()[0].get("name"),
        Some(&Value::Text("Mustermann".into()))
    );

    // Equal sort keys keep record order: absences share one date-free
    // employee key ordering by position.
    let tied = ctx
        .session
        .query("5ABSEN")
        .order_by("employee_id", OrderDirection::Asc)
        .execute()
        .unwrap();
    let ids: Vec<_> = tied.iter().map(|r| r.get("id").cloned().unwrap()).collect();
    assert_eq!(
        ids,
        vec![Value::Int(10), Value::Int(11), Value::Int(12)]
    );
}

#[test]
fn test_pagination_after_aggregation() {
    // offset=10, limit=5 against a 3-row aggregated result: zero rows,
    // not an error.
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5ABSEN")
        .group_by(["id"])
        .measure(Measure::count("n"))
        .offset(10)
        .limit(5)
        .execute()
        .unwrap();

    assert!(result.is_empty());
}

#[test]
fn test_limit_counts_aggregated_rows() {
    let ctx = TestContext::new();
    // Three absences collapse to two employee groups; limit applies to
    // the two groups, not the three source rows.
    let result = ctx
        .session
        .query("5ABSEN")
        .group_by(["employee_id"])
        .measure(Measure::count("absences"))
        .limit(2)
        .execute()
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.rows()[0].get("absences"), Some(&Value::Int(2)));
    assert_eq!(result.rows()[1].get("absences"), Some(&Value::Int(1)));
}

#[test]
fn test_aggregation_measures() {
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5EMPL")
        .measure(Measure::count("n"))
        .measure(Measure::sum("total_hours", "hrsweek"))
        .measure(Measure::avg("mean_hours", "hrsweek"))
        .measure(Measure::min("min_hours", "hrsweek"))
        .measure(Measure::max("max_hours", "hrsweek"))
        .execute()
        .unwrap();

    assert_eq!(result.len(), 1);
    let row = &result.rows()[0];
    assert_eq!(row.get("n"), Some(&Value::Int(2)));
    assert_eq!(row.get("total_hours"), Some(&Value::Float(58.5)));
    assert_eq!(row.get("mean_hours"), Some(&Value::Float(29.25)));
    assert_eq!(row.get("min_hours"), Some(&Value::Float(20.0)));
    assert_eq!(row.get("max_hours"), Some(&Value::Float(38.5)));
}

#[test]
fn test_fuzzy_filter() {
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::fuzzy("name", "Musterman", 0.85))
        .execute()
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(
        result.rows()[0].get("name"),
        Some(&Value::Text("Mustermann".into()))
    );
}

#[test]
fn test_between_and_in_filters() {
    let ctx = TestContext::new();

    let result = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::between("hrsweek", 30.0, 40.0))
        .execute()
        .unwrap();
    assert_eq!(result.len(), 1);

    let result = ctx
        .session
        .query("5ABSEN")
        .filter(Predicate::is_in("id", [10i64, 12]))
        .execute()
        .unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn test_unknown_field_rejected_before_execution() {
    let ctx = TestContext::new();
    let err = ctx
        .session
        .query("5EMPL")
        .filter(Predicate::eq("salary", 1i64))
        .execute()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Query(QueryError::UnknownField { .. })
    ));
}

#[test]
fn test_unknown_relation_rejected() {
    let ctx = TestContext::new();
    let err = ctx
        .session
        .query("5EMPL")
        .join("no_such_relation")
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::UnknownRelation(_))));
}

#[test]
fn test_unrelated_join_rejected() {
    let ctx = TestContext::new();
    let err = ctx
        .session
        .query("5LEAVT")
        .join("employee_absences")
        .execute()
        .unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::UnrelatedJoin { .. })));
}

#[test]
fn test_negative_pagination_rejected() {
    let ctx = TestContext::new();

    let err = ctx.session.query("5EMPL").offset(-1).execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Query(QueryError::InvalidPagination(_))
    ));

    let err = ctx.session.query("5EMPL").limit(-5).execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Query(QueryError::InvalidPagination(_))
    ));
}

#[test]
fn test_undeclared_base_table_is_dependency_error() {
    let ctx = TestContext::new();
    let err = ctx.session.query("5NOPE").execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Dependency(DependencyError::UnknownTable(_))
    ));
}

#[test]
fn test_provenance_records_operations_in_execution_order() {
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5EMPL")
        .limit(5)
        .filter(Predicate::contains("name", "Muster"))
        .join("employee_absences")
        .order_by("id", OrderDirection::Asc)
        .execute()
        .unwrap();

    let provenance = result.provenance();
    assert_eq!(provenance.table, "5EMPL");
    let ops = &provenance.operations;
    assert!(ops[0].starts_with("filter"));
    assert!(ops[1].starts_with("join"));
    assert!(ops[2].starts_with("sort"));
    assert!(ops[3].starts_with("offset"));
}

#[test]
fn test_query_engine_is_concurrency_safe() {
    let ctx = TestContext::new();
    let session = &ctx.session;

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(move || {
                let result = session
                    .query("5EMPL")
                    .filter(Predicate::contains("name", "Muster"))
                    .join("employee_absences")
                    .execute()
                    .unwrap();
                assert_eq!(result.len(), 2);
            });
        }
    });
}

#[test]
fn test_multi_join() {
    let ctx = TestContext::new();
    let result = ctx
        .session
        .query("5ABSEN")
        .join("employee_absences")
        .join("leave_type_absences")
        .execute()
        .unwrap();

    assert_eq!(result.len(), 3);
    for row in &result {
        assert!(row.joined_record("employee_absences").is_some());
        assert_eq!(
            row.joined_record("leave_type_absences").unwrap().get("name"),
            Some(&Value::Text("Urlaub".into()))
        );
    }
}
