//! End-to-end cache lifecycle: init persists the graph keyed by the
//! repository HEAD, a second init hits the cache, and a new commit
//! supersedes the old entry.

use std::path::Path;

use lineage_core::{GraphConfig, ProjectConfig};
use lineage_graph::{cache, current_revision, ModuleGraph};

fn commit(repo: &git2::Repository, message: &str) -> git2::Oid {
    let sig = git2::Signature::now("test", "test@example.com").unwrap();
    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .and_then(|oid| repo.find_commit(oid).ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn write_manifest(dir: &Path, src: &Path) -> std::path::PathBuf {
    let manifest_path = dir.join("stats.json");
    let manifest = format!(
        r#"{{"modules": [
            {{"resource": "{0}/App.vue",
             "dependencies": [{{"request": "{0}/Card.vue"}}]}}
        ]}}"#,
        src.display()
    );
    std::fs::write(&manifest_path, manifest).unwrap();
    manifest_path
}

#[tokio::test]
async fn cache_entries_are_keyed_by_revision() {
    let dir = tempfile::tempdir().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();
    commit(&repo, "initial");
    let r1 = current_revision(dir.path()).unwrap();

    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    let manifest_path = write_manifest(dir.path(), &src);
    let cache_dir = dir.path().join(".lineage-cache");

    let project = ProjectConfig {
        root: dir.path().to_path_buf(),
        ..Default::default()
    };
    let graph_config = GraphConfig {
        manifest_path: Some(manifest_path.clone()),
        cache_dir: cache_dir.clone(),
        bundler_command: None,
    };

    let graph = ModuleGraph::new();
    graph.init(&project, &graph_config).await.unwrap();
    let card = format!("{}/Card.vue", src.display());
    assert_eq!(graph.get_parents(&card).len(), 1);
    assert!(cache::load(&cache_dir, &r1).is_some());

    // with the manifest gone, a re-init must be served by the cache
    std::fs::remove_file(&manifest_path).unwrap();
    let cached = ModuleGraph::new();
    cached.init(&project, &graph_config).await.unwrap();
    assert_eq!(cached.get_parents(&card).len(), 1);

    // a new commit changes the revision; the old entry is never
    // consulted and, with no other strategy left, the graph is empty
    commit(&repo, "second");
    let r2 = current_revision(dir.path()).unwrap();
    assert_ne!(r1, r2);
    assert!(cache::load(&cache_dir, &r2).is_none());

    let stale = ModuleGraph::new();
    stale.init(&project, &graph_config).await.unwrap();
    assert!(stale.is_empty());
}
