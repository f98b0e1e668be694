//! Cache manifest: one entry per table, keyed by content hash.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Manifest entry describing one cached table blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Table name.
    pub table: String,
    /// Hex blake3 digest of the source file the blob was decoded from.
    pub file_hash: String,
    /// Number of records in the blob.
    pub record_count: u64,
    /// When the decode happened.
    pub decoded_at: DateTime<Utc>,
}

/// The on-disk manifest. A missing or unreadable manifest is an empty one;
/// stale entries are ignored, never deleted.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Manifest {
    pub entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    pub(crate) fn load(path: &Path) -> Manifest {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "unreadable cache manifest; starting empty");
                    Manifest::default()
                }
            },
            Err(_) => Manifest::default(),
        }
    }

    pub(crate) fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut manifest = Manifest::default();
        manifest.entries.insert(
            "5EMPL".to_string(),
            ManifestEntry {
                table: "5EMPL".to_string(),
                file_hash: "abc123".to_string(),
                record_count: 42,
                decoded_at: Utc::now(),
            },
        );
        manifest.save(&path).unwrap();

        let loaded = Manifest::load(&path);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries["5EMPL"].file_hash, "abc123");
        assert_eq!(loaded.entries["5EMPL"].record_count, 42);
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::load(&dir.path().join("manifest.json"));
        assert!(manifest.entries.is_empty());
    }

    #[test]
    fn test_corrupt_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, "{ not json").unwrap();
        let manifest = Manifest::load(&path);
        assert!(manifest.entries.is_empty());
    }
}
