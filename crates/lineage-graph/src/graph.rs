//! Forward/reverse module adjacency built from a bundler manifest, with
//! an explicit `init`/query lifecycle. The service is a process-wide
//! singleton constructed by the caller and passed down through context;
//! it performs no work at import time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Stdio;

use parking_lot::RwLock;

use crate::cache::{self, CacheFile};
use crate::manifest::Manifest;
use crate::resolve::PathResolver;
use crate::revision;
use lineage_core::{GraphConfig, LineageError, ProjectConfig, Result};

#[derive(Debug, Default)]
struct Adjacency {
    /// parent → children ("I reference").
    forward: BTreeMap<String, BTreeSet<String>>,
    /// child → parents ("referenced by").
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl Adjacency {
    fn link(&mut self, parent: &str, child: &str) {
        if parent == child {
            return;
        }
        self.forward
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
        self.reverse
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }
}

pub struct ModuleGraph {
    maps: RwLock<Adjacency>,
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Adjacency::default()),
        }
    }

    /// Initializes the graph, idempotently. Clears any existing state,
    /// then tries in order: the revision-keyed cache, a live bundler
    /// build, a previously emitted manifest file. All three failing
    /// leaves the graph empty; queries then degrade to empty results.
    pub async fn init(&self, project: &ProjectConfig, graph: &GraphConfig) -> Result<()> {
        self.clear();
        let resolver = PathResolver::new(&project.root, &project.source_root());
        let revision = revision::current_revision(&project.root);
        if revision.is_none() {
            tracing::debug!("no revision identifier; graph cache disabled");
        }

        if let Some(rev) = &revision {
            if let Some(entry) = cache::load(&graph.cache_dir, rev) {
                self.load_cache(&entry);
                tracing::info!(revision = %rev, modules = self.node_count(), "graph loaded from cache");
                return Ok(());
            }
        }

        match self.try_live_build(graph, &resolver).await {
            Ok(()) => {
                tracing::info!(modules = self.node_count(), "graph built from live bundler pass");
                self.persist(&graph.cache_dir, revision.as_deref());
                return Ok(());
            }
            Err(err) => tracing::warn!(%err, "live graph build unavailable"),
        }

        match self.try_manifest_file(graph, &resolver) {
            Ok(()) => {
                tracing::info!(modules = self.node_count(), "graph built from manifest file");
                self.persist(&graph.cache_dir, revision.as_deref());
                return Ok(());
            }
            Err(err) => tracing::warn!(%err, "manifest file unavailable"),
        }

        tracing::warn!("all graph init strategies failed; queries will return empty results");
        Ok(())
    }

    /// Runs the configured bundler command and parses its stdout as the
    /// stats manifest.
    async fn try_live_build(&self, graph: &GraphConfig, resolver: &PathResolver) -> Result<()> {
        let command = graph
            .bundler_command
            .as_ref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LineageError::GraphBuild("no bundler command configured".into()))?;

        let output = tokio::process::Command::new(&command[0])
            .args(&command[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| LineageError::GraphBuild(format!("bundler spawn failed: {}", e)))?;
        if !output.status.success() {
            return Err(LineageError::GraphBuild(format!(
                "bundler exited with {}",
                output.status
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let manifest = Manifest::parse(&text)
            .map_err(|e| LineageError::GraphBuild(format!("bundler output not a manifest: {}", e)))?;
        self.build_graph(&manifest, resolver);
        Ok(())
    }

    fn try_manifest_file(&self, graph: &GraphConfig, resolver: &PathResolver) -> Result<()> {
        let path = graph
            .manifest_path
            .as_ref()
            .ok_or_else(|| LineageError::GraphBuild("no manifest path configured".into()))?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| LineageError::GraphBuild(format!("{}: {}", path.display(), e)))?;
        let manifest = Manifest::parse(&text)
            .map_err(|e| LineageError::GraphBuild(format!("{}: {}", path.display(), e)))?;
        self.build_graph(&manifest, resolver);
        Ok(())
    }

    /// Links every flattened manifest module: its own dependencies as
    /// parent→child, its reasons as referrer→module. Self-loops and
    /// paths outside the tracked source tree are rejected.
    pub fn build_graph(&self, manifest: &Manifest, resolver: &PathResolver) {
        let mut maps = self.maps.write();
        for module in manifest.flatten() {
            let Some(request) = module.request() else { continue };
            let own = resolver.resolve(request, None);
            if !resolver.is_tracked(&own) {
                continue;
            }
            let own_dir = Path::new(&own).parent().map(Path::to_path_buf);

            for dep in &module.dependencies {
                let Some(request) = dep.request() else { continue };
                let child = resolver.resolve(request, own_dir.as_deref());
                if resolver.is_tracked(&child) {
                    maps.link(&own, &child);
                }
            }
            for reason in &module.reasons {
                let Some(referrer) = reason.module_name.as_deref().filter(|s| !s.is_empty())
                else {
                    continue;
                };
                let parent = resolver.resolve(referrer, None);
                if resolver.is_tracked(&parent) {
                    maps.link(&parent, &own);
                }
            }
        }
    }

    pub fn clear(&self) {
        *self.maps.write() = Adjacency::default();
    }

    /// Modules referencing `path`, deduplicated, in stable sorted order
    /// so a first-match parent policy is deterministic.
    pub fn get_parents(&self, path: &str) -> Vec<String> {
        self.maps
            .read()
            .reverse
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Modules `path` references, deduplicated, sorted.
    pub fn get_children(&self, path: &str) -> Vec<String> {
        self.maps
            .read()
            .forward
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        let maps = self.maps.read();
        let mut nodes: BTreeSet<&String> = maps.forward.keys().collect();
        nodes.extend(maps.reverse.keys());
        nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        let maps = self.maps.read();
        maps.forward.is_empty() && maps.reverse.is_empty()
    }

    fn load_cache(&self, entry: &CacheFile) {
        let mut maps = self.maps.write();
        for (parent, children) in &entry.forward_map {
            for child in children {
                maps.link(parent, child);
            }
        }
        for (child, parents) in &entry.reverse_map {
            for parent in parents {
                maps.link(parent, child);
            }
        }
    }

    fn persist(&self, cache_dir: &Path, revision: Option<&str>) {
        let Some(revision) = revision else { return };
        let maps = self.maps.read();
        let forward = maps
            .forward
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect();
        let reverse = maps
            .reverse
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect();
        drop(maps);
        if let Err(err) = cache::store(cache_dir, revision, &CacheFile::new(forward, reverse)) {
            tracing::warn!(%err, "graph cache write failed");
        }
    }
}
