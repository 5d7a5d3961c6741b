//! Module dependency graph for the lineage tracer: bundler-manifest
//! parsing, path resolution, forward/reverse adjacency and a
//! revision-keyed on-disk cache.

pub mod cache;
pub mod graph;
pub mod manifest;
pub mod resolve;
pub mod revision;

pub use cache::{CacheFile, GRAPH_CACHE_VERSION};
pub use graph::ModuleGraph;
pub use manifest::{Manifest, ManifestModule};
pub use resolve::PathResolver;
pub use revision::current_revision;
