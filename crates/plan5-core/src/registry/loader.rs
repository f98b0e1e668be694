//! Dependency-ordered multi-table loading.
//!
//! Tables load level by level: everything within a dependency level runs
//! on its own scoped worker thread, and a level starts only after the
//! levels it depends on finished. One broken table never aborts the rest;
//! its failure is recorded in the session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::session::{LoadSession, LoadedTable, TableStatus};
use crate::cache::{hash_file, CacheStats, DecodeCache};
use crate::catalog::{Catalog, TableDef};
use crate::dbf::Decoder;
use crate::error::{DecodeError, DependencyError, Error};
use crate::index::RelationIndexSet;
use crate::record::Record;

/// Options for one `load_all` run.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Wall-clock budget, checked at dependency-level boundaries. A single
    /// table decode is bounded and never cancelled mid-flight.
    pub timeout: Option<Duration>,
}

/// Orchestrates loading: enumerates the source directory, walks the
/// catalog's dependency levels, and consults the decode cache before
/// falling back to the decoder.
pub struct Registry {
    catalog: Arc<Catalog>,
    cache: DecodeCache,
}

impl Registry {
    /// A registry without a persistent cache directory. Decodes are still
    /// shared within the process.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            cache: DecodeCache::in_memory(),
        }
    }

    /// A registry with a persistent decode cache at `cache_dir`.
    pub fn with_cache_dir(catalog: Arc<Catalog>, cache_dir: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self {
            catalog,
            cache: DecodeCache::open(cache_dir)?,
        })
    }

    /// The catalog this registry loads against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Cache counters (hits, misses, decode invocations).
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Load every declared table from `source_dir` with default options.
    pub fn load_all(&self, source_dir: impl AsRef<Path>) -> Result<LoadSession, Error> {
        self.load_with(source_dir, LoadOptions::default())
    }

    /// Load every declared table from `source_dir`.
    ///
    /// Errors only for an unreadable source directory or an expired
    /// timeout; per-table failures are recorded in the returned session.
    pub fn load_with(
        &self,
        source_dir: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<LoadSession, Error> {
        let source_dir = source_dir.as_ref();
        let files = enumerate_table_files(source_dir)?;
        let started = Instant::now();

        let mut statuses: HashMap<String, TableStatus> = HashMap::new();

        for level in self.catalog.dependency_levels() {
            if let Some(timeout) = options.timeout {
                if started.elapsed() >= timeout {
                    return Err(DependencyError::Timeout(timeout).into());
                }
            }

            let results: Mutex<Vec<(String, TableStatus)>> = Mutex::new(Vec::new());
            let results_ref = &results;
            let files_ref = &files;

            std::thread::scope(|scope| {
                for name in level {
                    let Some(table) = self.catalog.get(name) else {
                        continue;
                    };
                    scope.spawn(move || {
                        let path = files_ref.get(&table.file_stem.to_ascii_uppercase());
                        let status = self.load_one(table, path.map(PathBuf::as_path));
                        results_ref.lock().push((name.clone(), status));
                    });
                }
            });

            statuses.extend(results.into_inner());
        }

        let loaded: HashMap<String, Arc<Vec<Record>>> = statuses
            .iter()
            .filter_map(|(name, status)| match status {
                TableStatus::Loaded(table) => Some((name.clone(), Arc::clone(&table.records))),
                _ => None,
            })
            .collect();
        let indexes = RelationIndexSet::build(&self.catalog, &loaded);

        let session = LoadSession::new(Arc::clone(&self.catalog), statuses, indexes);
        let stats = session.stats();
        info!(
            loaded = stats.loaded,
            failed = stats.failed,
            missing = stats.missing,
            records = stats.total_records,
            unresolved_relations = session.indexes().unresolved().len(),
            "load session complete"
        );
        Ok(session)
    }

    fn load_one(&self, table: &TableDef, path: Option<&Path>) -> TableStatus {
        let Some(path) = path else {
            if table.optional {
                debug!(table = %table.name, "optional table has no source file");
            } else {
                warn!(table = %table.name, "source file not found");
            }
            return TableStatus::Missing;
        };

        let file_hash = match hash_file(path) {
            Ok(hash) => hash,
            Err(source) => {
                warn!(table = %table.name, error = %source, "source file unreadable");
                return TableStatus::Failed(Arc::new(DecodeError::Io {
                    path: path.to_path_buf(),
                    source,
                }));
            }
        };

        let mut notes = Vec::new();
        let outcome = self.cache.load_or_decode(&table.name, &file_hash, || {
            let decoded = Decoder::open(path, table)?.decode_eager()?;
            notes = decoded.advisories;
            Ok(decoded.records)
        });

        match outcome {
            Ok(records) => {
                debug!(table = %table.name, records = records.len(), "table loaded");
                TableStatus::Loaded(Arc::new(LoadedTable {
                    name: table.name.clone(),
                    records,
                    file_hash,
                    decoded_at: Utc::now(),
                    notes,
                }))
            }
            Err(error) => {
                warn!(table = %table.name, error = %error, "table failed to decode");
                TableStatus::Failed(error)
            }
        }
    }
}

/// Map `UPPERCASE_STEM -> path` for every `*.dbf` file in the directory.
/// Unrecognized files are simply never matched by a table descriptor.
fn enumerate_table_files(dir: &Path) -> Result<HashMap<String, PathBuf>, Error> {
    let mut files = HashMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_dbf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("dbf"))
            .unwrap_or(false);
        if !is_dbf {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(stem.to_ascii_uppercase(), path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_filters_non_dbf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("5EMPL.DBF"), b"x").unwrap();
        std::fs::write(dir.path().join("5note.dbf"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("backup.zip"), b"x").unwrap();

        let files = enumerate_table_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains_key("5EMPL"));
        assert!(files.contains_key("5NOTE"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(enumerate_table_files(&missing).is_err());
    }
}
