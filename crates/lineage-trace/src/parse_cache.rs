//! Request-scoped component cache. The three category walks may visit
//! the same parent file; each path is read and parsed at most once per
//! request, and the cached component is immutable thereafter.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use lineage_core::{Dialect, LineageError, Result};
use lineage_parser::{parse_component, ParsedComponent};

#[derive(Debug)]
pub struct CachedComponent {
    pub component: ParsedComponent,
    /// Full file text, kept for coordinate math and snippet extraction.
    pub raw: String,
}

pub struct ParseCache {
    order: [Dialect; 2],
    entries: DashMap<String, Arc<CachedComponent>>,
}

impl ParseCache {
    pub fn new(order: [Dialect; 2]) -> Self {
        Self {
            order,
            entries: DashMap::new(),
        }
    }

    /// The component at `path`, parsed on first access. Concurrent
    /// callers may parse in parallel, but the per-key entry guard
    /// ensures one result wins and every caller sees the same handle.
    pub fn get_or_parse(&self, path: &str) -> Result<Arc<CachedComponent>> {
        if let Some(entry) = self.entries.get(path) {
            return Ok(entry.clone());
        }
        if !Path::new(path).is_file() {
            return Err(LineageError::FileNotFound(path.to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let component = parse_component(&raw, path, &self.order)?;
        let cached = Arc::new(CachedComponent { component, raw });
        Ok(self
            .entries
            .entry(path.to_string())
            .or_insert(cached)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
