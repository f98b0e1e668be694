//! Error types for the core.
//!
//! Each phase of the pipeline has its own error kind: `SchemaError` is fatal
//! at catalog build, `DecodeError` is scoped to a single table, and
//! `DependencyError`/`QueryError` are recoverable by the caller. Cache
//! integrity problems never surface here; a stale or unreadable cache entry
//! degrades to a miss.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A single constraint violation found while building the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Table the violation was found on.
    pub table: String,
    /// What is wrong.
    pub detail: String,
}

impl Violation {
    pub fn new(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.table, self.detail)
    }
}

/// Schema catalog errors. Fatal at catalog build; no partial catalog is
/// usable once one of these is raised.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The declared configuration failed the constraint pass.
    #[error("schema validation failed with {} violation(s): {}", .0.len(), format_violations(.0))]
    Invalid(Vec<Violation>),

    /// A table name was requested that the catalog does not declare.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A relation name was requested that the catalog does not declare.
    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    /// The declarative configuration could not be parsed at all.
    #[error("malformed schema configuration: {0}")]
    Config(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Record decoder errors. Structurally corrupt input only; encoding
/// fallback is an advisory, not an error. Scoped to one table.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header is inconsistent with the file contents.
    #[error("corrupt header in {}: {detail}", .path.display())]
    Header { path: PathBuf, detail: String },

    /// A record boundary could not be read.
    #[error("corrupt record {index} in {}: {detail}", .path.display())]
    Record {
        path: PathBuf,
        index: u32,
        detail: String,
    },
}

/// Errors surfaced when a caller asks for a table the session cannot serve.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The table was never declared in the schema catalog.
    #[error("table {0} is not declared in the schema catalog")]
    UnknownTable(String),

    /// The table is declared but did not load in this session.
    #[error("table {name} is unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    /// The load did not complete within the caller's budget.
    #[error("load did not complete within {0:?}")]
    Timeout(Duration),
}

/// Query plan errors. A malformed plan is rejected before any partial
/// execution.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A predicate, sort, or group key references an undeclared field.
    #[error("unknown field {field} on table {table}")]
    UnknownField { table: String, field: String },

    /// A join references an undeclared relation.
    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    /// A join references a relation that does not touch the base table.
    #[error("relation {relation} does not touch table {table}")]
    UnrelatedJoin { relation: String, table: String },

    /// Offset or limit was negative.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// An aggregation measure is malformed.
    #[error("invalid aggregation: {0}")]
    InvalidAggregation(String),
}

/// Top-level core error.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema catalog error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Record decoder error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Table dependency error.
    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// Query plan error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Filesystem error outside the decoder (source directory, cache dir).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let v = Violation::new("5ABSEN", "relation target 5MISSING is not declared");
        assert_eq!(
            v.to_string(),
            "5ABSEN: relation target 5MISSING is not declared"
        );
    }

    #[test]
    fn test_invalid_schema_lists_violations() {
        let err = SchemaError::Invalid(vec![
            Violation::new("5ABSEN", "unknown target"),
            Violation::new("5NOTE", "duplicate table"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 violation(s)"));
        assert!(msg.contains("5ABSEN"));
        assert!(msg.contains("5NOTE"));
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = SchemaError::UnknownTable("5EMPL".into()).into();
        assert!(matches!(err, Error::Schema(_)));

        let err: Error = DependencyError::UnknownTable("5EMPL".into()).into();
        assert!(matches!(err, Error::Dependency(_)));
    }
}
