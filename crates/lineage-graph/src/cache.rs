//! Revision-keyed on-disk graph cache. An entry is written once and
//! never mutated; a changed revision produces a differently named file,
//! so stale entries are superseded rather than updated in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lineage_core::Result;

/// Version tag baked into cache file names; bumping it invalidates
/// every existing entry.
pub const GRAPH_CACHE_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    pub forward_map: BTreeMap<String, Vec<String>>,
    pub reverse_map: BTreeMap<String, Vec<String>>,
    /// Unix seconds at write time; informational only, invalidation is
    /// revision-based.
    pub timestamp: i64,
}

impl CacheFile {
    pub fn new(
        forward_map: BTreeMap<String, Vec<String>>,
        reverse_map: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            forward_map,
            reverse_map,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

pub fn cache_path(cache_dir: &Path, revision: &str) -> PathBuf {
    cache_dir.join(format!("graph-{}-{}.json", GRAPH_CACHE_VERSION, revision))
}

/// Loads the entry for `revision`. Any absence or read/parse failure is
/// a plain miss.
pub fn load(cache_dir: &Path, revision: &str) -> Option<CacheFile> {
    let path = cache_path(cache_dir, revision);
    let text = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&text) {
        Ok(file) => {
            tracing::debug!(path = %path.display(), "graph cache hit");
            Some(file)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "unreadable graph cache entry");
            None
        }
    }
}

pub fn store(cache_dir: &Path, revision: &str, file: &CacheFile) -> Result<()> {
    std::fs::create_dir_all(cache_dir)?;
    let path = cache_path(cache_dir, revision);
    let text = serde_json::to_string_pretty(file)?;
    std::fs::write(&path, text)?;
    tracing::debug!(path = %path.display(), "graph cache written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CacheFile {
        let mut forward = BTreeMap::new();
        forward.insert(
            "/app/src/App.vue".to_string(),
            vec!["/app/src/Card.vue".to_string()],
        );
        let mut reverse = BTreeMap::new();
        reverse.insert(
            "/app/src/Card.vue".to_string(),
            vec!["/app/src/App.vue".to_string()],
        );
        CacheFile::new(forward, reverse)
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        store(dir.path(), "abc123", &sample()).unwrap();
        let loaded = load(dir.path(), "abc123").unwrap();
        assert_eq!(
            loaded.forward_map["/app/src/App.vue"],
            vec!["/app/src/Card.vue"]
        );
        assert!(loaded.timestamp > 0);
    }

    #[test]
    fn entry_for_a_different_revision_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        store(dir.path(), "r1", &sample()).unwrap();
        assert!(load(dir.path(), "r2").is_none());
        assert!(load(dir.path(), "r1").is_some());
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("forwardMap").is_some());
        assert!(json.get("reverseMap").is_some());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(cache_path(dir.path(), "bad"), "not json").unwrap();
        assert!(load(dir.path(), "bad").is_none());
    }
}
