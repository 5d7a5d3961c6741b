//! Request-string resolution: loader-prefix and query stripping, alias
//! expansion, lexical normalization and best-effort extension probing
//! against the target project tree.

use std::path::{Component, Path, PathBuf};

/// Extensions probed when a request omits one, in priority order.
const PROBE_EXTENSIONS: &[&str] = &["vue", "js", "ts", "jsx", "tsx"];

#[derive(Debug, Clone)]
pub struct PathResolver {
    project_root: PathBuf,
    source_root: PathBuf,
}

impl PathResolver {
    pub fn new(project_root: &Path, source_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            source_root: source_root.to_path_buf(),
        }
    }

    /// Resolves one dependency request to a normalized path string.
    /// `importer_dir` anchors relative requests; bundler-relative
    /// requests (`./src/...`) anchor at the project root.
    pub fn resolve(&self, request: &str, importer_dir: Option<&Path>) -> String {
        let request = strip_decorations(request);
        let expanded = self.expand(request, importer_dir);
        let normalized = normalize(&expanded);
        let probed = self.probe(normalized);
        to_slash_string(&probed)
    }

    /// Whether a resolved path lies under the tracked source tree.
    pub fn is_tracked(&self, path: &str) -> bool {
        Path::new(path).starts_with(&self.source_root)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    fn expand(&self, request: &str, importer_dir: Option<&Path>) -> PathBuf {
        if let Some(rest) = request.strip_prefix("@/") {
            return self.source_root.join(rest);
        }
        let path = Path::new(request);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        if request.starts_with("./") || request.starts_with("../") {
            let anchor = importer_dir.unwrap_or(&self.project_root);
            return anchor.join(request);
        }
        // bare names: bundler output anchors them at the project root
        self.project_root.join(request)
    }

    /// Probes known extensions and index files for a request that does
    /// not name an existing file. A miss returns the path unchanged so
    /// graph admission can still decide on containment alone.
    fn probe(&self, path: PathBuf) -> PathBuf {
        if path.is_file() {
            return path;
        }
        if path.extension().is_none() {
            for ext in PROBE_EXTENSIONS {
                let candidate = path.with_extension(ext);
                if candidate.is_file() {
                    return candidate;
                }
            }
            for ext in PROBE_EXTENSIONS {
                let candidate = path.join(format!("index.{}", ext));
                if candidate.is_file() {
                    return candidate;
                }
            }
        }
        path
    }
}

/// Drops loader prefixes (`babel-loader!./x`) and resource queries
/// (`./x.vue?vue&type=script`).
fn strip_decorations(request: &str) -> &str {
    let request = request.rsplit('!').next().unwrap_or(request);
    request.split('?').next().unwrap_or(request)
}

/// Lexically collapses `.` and `..` components without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn to_slash_string(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(Path::new("/app"), Path::new("/app/src"))
    }

    #[test]
    fn strips_loaders_and_queries() {
        assert_eq!(
            strip_decorations("vue-loader!./Card.vue?vue&type=template"),
            "./Card.vue"
        );
        assert_eq!(strip_decorations("./plain.js"), "./plain.js");
    }

    #[test]
    fn alias_expands_to_source_root() {
        let resolved = resolver().resolve("@/components/Card.vue", None);
        assert_eq!(resolved, "/app/src/components/Card.vue");
    }

    #[test]
    fn relative_requests_anchor_at_importer() {
        let resolved = resolver().resolve(
            "../utils/format.js",
            Some(Path::new("/app/src/components")),
        );
        assert_eq!(resolved, "/app/src/utils/format.js");
    }

    #[test]
    fn bundler_relative_requests_anchor_at_project_root() {
        let resolved = resolver().resolve("./src/main.js", None);
        assert_eq!(resolved, "/app/src/main.js");
    }

    #[test]
    fn containment_tracks_only_the_source_tree() {
        let resolver = resolver();
        assert!(resolver.is_tracked("/app/src/App.vue"));
        assert!(!resolver.is_tracked("/app/node_modules/vue/dist/vue.js"));
        assert!(!resolver.is_tracked("/elsewhere/src/App.vue"));
    }

    #[test]
    fn probing_finds_extensionless_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("api")).unwrap();
        std::fs::write(src.join("api/user.js"), "export default {};").unwrap();
        std::fs::write(src.join("api/index.js"), "export * from './user';").unwrap();

        let resolver = PathResolver::new(dir.path(), &src);
        let direct = resolver.resolve("@/api/user", None);
        assert!(direct.ends_with("api/user.js"));
        let index = resolver.resolve("@/api", None);
        assert!(index.ends_with("api/index.js"));
        // a miss keeps the normalized request
        let miss = resolver.resolve("@/api/missing", None);
        assert!(miss.ends_with("api/missing"));
    }
}
