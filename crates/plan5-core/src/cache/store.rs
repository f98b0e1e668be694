//! Content-addressed decode cache with at-most-once decode semantics.
//!
//! A cache hit is valid only when the stored hash exactly matches the
//! current file's content hash; any mismatch or unreadable blob is a miss,
//! never an error. Concurrent requesters for the same uncached
//! `(table, hash)` pair block on a single in-flight decode instead of
//! repeating the work.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::manifest::{Manifest, ManifestEntry};
use crate::error::DecodeError;
use crate::record::Record;

const MANIFEST_FILE: &str = "manifest.json";

/// Outcome of a guarded decode, shared between concurrent requesters.
pub type DecodeOutcome = Result<Arc<Vec<Record>>, Arc<DecodeError>>;

/// Counters for the cache-hit and at-most-once properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from the cache (memory or disk).
    pub hits: u64,
    /// Requests that found no usable entry.
    pub misses: u64,
    /// Actual decoder invocations.
    pub decodes: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decodes: AtomicU64,
}

/// Persistent (or memory-only) store of previously decoded tables.
pub struct DecodeCache {
    dir: Option<PathBuf>,
    manifest: Mutex<Manifest>,
    inflight: DashMap<(String, String), Arc<OnceLock<DecodeOutcome>>>,
    counters: Counters,
}

impl DecodeCache {
    /// Open a cache directory, creating it if needed. The manifest is
    /// loaded leniently; a corrupt one starts empty.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let manifest = Manifest::load(&dir.join(MANIFEST_FILE));
        Ok(Self {
            dir: Some(dir),
            manifest: Mutex::new(manifest),
            inflight: DashMap::new(),
            counters: Counters::default(),
        })
    }

    /// A cache that shares decodes within the process but persists nothing.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            manifest: Mutex::new(Manifest::default()),
            inflight: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Check whether a valid entry exists without materializing records.
    pub fn verify(&self, table: &str, file_hash: &str) -> bool {
        let manifest = self.manifest.lock();
        match manifest.entries.get(table) {
            Some(entry) if entry.file_hash == file_hash => self
                .blob_path(table)
                .map(|p| p.exists())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Fetch the cached records for `(table, file_hash)`, if any.
    pub fn get(&self, table: &str, file_hash: &str) -> Option<Arc<Vec<Record>>> {
        if !self.verify(table, file_hash) {
            return None;
        }
        let path = self.blob_path(table)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                debug!(table, error = %e, "cache blob unreadable; treating as miss");
                return None;
            }
        };
        match serde_json::from_str::<Vec<Record>>(&json) {
            Ok(records) => Some(Arc::new(records)),
            Err(e) => {
                debug!(table, error = %e, "cache blob undecodable; treating as miss");
                None
            }
        }
    }

    /// Store decoded records. Best-effort: an unwritable cache degrades to
    /// cold loads with a warning, it never fails the caller.
    pub fn put(&self, table: &str, file_hash: &str, records: &Arc<Vec<Record>>) {
        let Some(path) = self.blob_path(table) else {
            return;
        };
        let json = match serde_json::to_string(records.as_ref()) {
            Ok(json) => json,
            Err(e) => {
                warn!(table, error = %e, "failed to serialize cache blob");
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            warn!(table, error = %e, "failed to write cache blob");
            return;
        }

        let mut manifest = self.manifest.lock();
        manifest.entries.insert(
            table.to_string(),
            ManifestEntry {
                table: table.to_string(),
                file_hash: file_hash.to_string(),
                record_count: records.len() as u64,
                decoded_at: Utc::now(),
            },
        );
        if let Some(dir) = &self.dir {
            if let Err(e) = manifest.save(&dir.join(MANIFEST_FILE)) {
                warn!(table, error = %e, "failed to write cache manifest");
            }
        }
    }

    /// Serve `(table, file_hash)` from the cache, or run `decode` exactly
    /// once while concurrent requesters for the same key wait for the
    /// result.
    pub fn load_or_decode(
        &self,
        table: &str,
        file_hash: &str,
        decode: impl FnOnce() -> Result<Vec<Record>, DecodeError>,
    ) -> DecodeOutcome {
        let key = (table.to_string(), file_hash.to_string());
        let cell = self.inflight.entry(key).or_default().value().clone();

        if let Some(outcome) = cell.get() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return outcome.clone();
        }

        cell.get_or_init(|| {
            if let Some(records) = self.get(table, file_hash) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(records);
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            self.counters.decodes.fetch_add(1, Ordering::Relaxed);
            match decode() {
                Ok(records) => {
                    let records = Arc::new(records);
                    self.put(table, file_hash, &records);
                    Ok(records)
                }
                Err(e) => Err(Arc::new(e)),
            }
        })
        .clone()
    }

    /// Snapshot of the hit/miss/decode counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            decodes: self.counters.decodes.load(Ordering::Relaxed),
        }
    }

    fn blob_path(&self, table: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{table}.records.json")))
    }
}

/// Hex blake3 digest of a file's contents.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
