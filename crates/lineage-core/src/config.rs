use std::path::{Path, PathBuf};

use config as cfg;
use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};
use crate::types::Dialect;

/// Which referencing parent to follow when the reverse graph returns
/// more than one. First-match is a policy choice, not a proven
/// heuristic, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPolicy {
    FirstMatch,
}

impl Default for ParentPolicy {
    fn default() -> Self {
        ParentPolicy::FirstMatch
    }
}

/// Relative ordering used when ranking variables that appear in more
/// than one category. Tunable; only the relative order matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub content: u8,
    pub attributes: u8,
    pub conditionals: u8,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            content: 3,
            attributes: 2,
            conditionals: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Root of the target frontend project.
    pub root: PathBuf,
    /// Tracked source tree, relative to `root`. Modules outside it are
    /// not admitted to the graph.
    #[serde(default = "ProjectConfig::default_source_dir")]
    pub source_dir: String,
    /// Directory holding state-store modules, relative to `root`.
    #[serde(default = "ProjectConfig::default_store_dir")]
    pub store_dir: String,
}

impl ProjectConfig {
    fn default_source_dir() -> String {
        "src".to_string()
    }

    fn default_store_dir() -> String {
        "src/store".to_string()
    }

    pub fn source_root(&self) -> PathBuf {
        self.root.join(&self.source_dir)
    }

    pub fn store_root(&self) -> PathBuf {
        self.root.join(&self.store_dir)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            source_dir: Self::default_source_dir(),
            store_dir: Self::default_store_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Previously emitted bundler manifest, used as the last init
    /// strategy.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    /// Where revision-keyed graph cache files live.
    #[serde(default = "GraphConfig::default_cache_dir")]
    pub cache_dir: PathBuf,
    /// External bundler invocation expected to produce the manifest;
    /// absent means the live-build strategy is skipped.
    #[serde(default)]
    pub bundler_command: Option<Vec<String>>,
}

impl GraphConfig {
    fn default_cache_dir() -> PathBuf {
        PathBuf::from(".lineage-cache")
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            manifest_path: None,
            cache_dir: Self::default_cache_dir(),
            bundler_command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Forces one template dialect instead of consulting the target
    /// project's declared framework version.
    #[serde(default)]
    pub dialect_override: Option<Dialect>,
    /// Node-source truncation budget, in lines.
    #[serde(default = "ParserConfig::default_max_node_lines")]
    pub max_node_lines: usize,
}

impl ParserConfig {
    fn default_max_node_lines() -> usize {
        30
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialect_override: None,
            max_node_lines: Self::default_max_node_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "TraceConfig::default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub parent_policy: ParentPolicy,
    #[serde(default)]
    pub weights: CategoryWeights,
}

impl TraceConfig {
    fn default_max_depth() -> usize {
        crate::types::MAX_TRACE_DEPTH
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::default_max_depth(),
            parent_policy: ParentPolicy::default(),
            weights: CategoryWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "BreakerConfig::default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "BreakerConfig::default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl BreakerConfig {
    fn default_failure_threshold() -> u32 {
        5
    }

    fn default_cooldown_secs() -> u64 {
        30
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: Self::default_failure_threshold(),
            cooldown_secs: Self::default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "ReasoningConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "ReasoningConfig::default_model")]
    pub model: String,
    /// Environment variable holding the API key; the key itself never
    /// lives in config files.
    #[serde(default = "ReasoningConfig::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "ReasoningConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "ReasoningConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "ReasoningConfig::default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub breaker: BreakerConfig,
}

impl ReasoningConfig {
    fn default_endpoint() -> String {
        "http://localhost:11434/v1/chat/completions".to_string()
    }

    fn default_model() -> String {
        "qwen2.5-coder".to_string()
    }

    fn default_api_key_env() -> String {
        "LINEAGE_API_KEY".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    fn default_max_retries() -> u32 {
        2
    }

    fn default_max_concurrency() -> usize {
        3
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            model: Self::default_model(),
            api_key_env: Self::default_api_key_env(),
            timeout_secs: Self::default_timeout_secs(),
            max_retries: Self::default_max_retries(),
            max_concurrency: Self::default_max_concurrency(),
            breaker: BreakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

impl Settings {
    /// Loads settings from an optional TOML file layered under
    /// `LINEAGE_`-prefixed environment overrides. A missing file falls
    /// back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = cfg::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(cfg::File::from(path).required(false));
        }
        builder = builder.add_source(
            cfg::Environment::with_prefix("LINEAGE")
                .separator("__")
                .try_parsing(true),
        );
        let loaded = builder
            .build()
            .map_err(|e| LineageError::Config(e.to_string()))?;
        loaded
            .try_deserialize()
            .map_err(|e| LineageError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.trace.max_depth, crate::types::MAX_TRACE_DEPTH);
        assert_eq!(settings.reasoning.breaker.failure_threshold, 5);
        assert_eq!(settings.project.source_dir, "src");
        assert_eq!(settings.trace.parent_policy, ParentPolicy::FirstMatch);
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[trace]\nmax_depth = 4\n\n[reasoning]\ntimeout_secs = 5"
        )
        .unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.trace.max_depth, 4);
        assert_eq!(settings.reasoning.timeout_secs, 5);
        // untouched sections keep their defaults
        assert_eq!(settings.reasoning.max_retries, 2);
        assert_eq!(settings.graph.cache_dir, PathBuf::from(".lineage-cache"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let settings = Settings::load(Some(Path::new("/nonexistent/lineage.toml"))).unwrap();
        assert_eq!(settings.parser.max_node_lines, 30);
    }
}
