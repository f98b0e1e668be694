//! Immutable load-session snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::Catalog;
use crate::error::{DecodeError, DependencyError};
use crate::index::RelationIndexSet;
use crate::query::QueryBuilder;
use crate::record::Record;

/// One successfully decoded table.
#[derive(Debug)]
pub struct LoadedTable {
    /// Table name.
    pub name: String,
    /// Records in file order.
    pub records: Arc<Vec<Record>>,
    /// Hex blake3 digest of the source file.
    pub file_hash: String,
    /// When this session decoded (or cache-served) the table.
    pub decoded_at: DateTime<Utc>,
    /// Non-fatal decode observations (e.g. encoding fallback).
    pub notes: Vec<String>,
}

impl LoadedTable {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table decoded to zero records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `position`, if any.
    pub fn record(&self, position: u32) -> Option<&Record> {
        self.records.get(position as usize)
    }
}

/// Per-table outcome of a load.
#[derive(Debug)]
pub enum TableStatus {
    /// Decoded (or served from cache).
    Loaded(Arc<LoadedTable>),
    /// The source file was structurally corrupt or unreadable.
    Failed(Arc<DecodeError>),
    /// No source file was found for the declared table.
    Missing,
}

/// Aggregate load outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Tables available for queries.
    pub loaded: usize,
    /// Tables that failed to decode.
    pub failed: usize,
    /// Declared tables without a source file.
    pub missing: usize,
    /// Total records across loaded tables.
    pub total_records: u64,
}

/// An immutable snapshot of one `load_all` run: per-table status plus the
/// relationship indexes built over the loaded tables.
///
/// Sessions are safe to share across threads; queries take no locks.
/// Reloading produces a new session and never mutates an existing one, so
/// in-flight queries against an old snapshot stay consistent.
#[derive(Debug)]
pub struct LoadSession {
    catalog: Arc<Catalog>,
    tables: HashMap<String, TableStatus>,
    indexes: RelationIndexSet,
    loaded_at: DateTime<Utc>,
}

impl LoadSession {
    pub(crate) fn new(
        catalog: Arc<Catalog>,
        tables: HashMap<String, TableStatus>,
        indexes: RelationIndexSet,
    ) -> Self {
        Self {
            catalog,
            tables,
            indexes,
            loaded_at: Utc::now(),
        }
    }

    /// The catalog this session was loaded against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// When the session snapshot was taken.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// The relationship indexes of this session.
    pub fn indexes(&self) -> &RelationIndexSet {
        &self.indexes
    }

    /// Fetch a loaded table, or a [`DependencyError`] explaining why it is
    /// not available. A partial load is never silent: the per-table status
    /// carries the recorded failure.
    pub fn table(&self, name: &str) -> Result<&Arc<LoadedTable>, DependencyError> {
        match self.tables.get(name) {
            Some(TableStatus::Loaded(table)) => Ok(table),
            Some(TableStatus::Failed(error)) => Err(DependencyError::Unavailable {
                name: name.to_string(),
                reason: error.to_string(),
            }),
            Some(TableStatus::Missing) => Err(DependencyError::Unavailable {
                name: name.to_string(),
                reason: "source file not found".to_string(),
            }),
            None => {
                if self.catalog.contains(name) {
                    Err(DependencyError::Unavailable {
                        name: name.to_string(),
                        reason: "not loaded in this session".to_string(),
                    })
                } else {
                    Err(DependencyError::UnknownTable(name.to_string()))
                }
            }
        }
    }

    /// Per-table status of the given table.
    pub fn status(&self, name: &str) -> Option<&TableStatus> {
        self.tables.get(name)
    }

    /// All per-table statuses.
    pub fn statuses(&self) -> impl Iterator<Item = (&str, &TableStatus)> {
        self.tables.iter().map(|(name, status)| (name.as_str(), status))
    }

    /// Names of tables that failed to load.
    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|(_, status)| matches!(status, TableStatus::Failed(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        for status in self.tables.values() {
            match status {
                TableStatus::Loaded(table) => {
                    stats.loaded += 1;
                    stats.total_records += table.len() as u64;
                }
                TableStatus::Failed(_) => stats.failed += 1,
                TableStatus::Missing => stats.missing += 1,
            }
        }
        stats
    }

    /// Start building a query against this session.
    pub fn query(&self, table: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table.into())
    }
}
