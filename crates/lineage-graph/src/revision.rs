//! Source-control revision lookup for cache keying.

use std::path::Path;

/// HEAD commit id of the repository containing `root`. Returns `None`
/// when there is no repository or HEAD is unborn, in which case every
/// cache probe is a miss.
pub fn current_revision(root: &Path) -> Option<String> {
    let repo = git2::Repository::discover(root).ok()?;
    let head = repo.head().ok()?;
    head.target().map(|oid| oid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_repository_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(current_revision(dir.path()), None);
    }

    #[test]
    fn fresh_repository_without_commits_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        assert_eq!(current_revision(dir.path()), None);
    }

    #[test]
    fn committed_repository_yields_head_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        assert_eq!(current_revision(dir.path()), Some(oid.to_string()));
    }
}
