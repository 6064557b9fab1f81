use anyhow::{Context, Result};
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version-control identity of the tree being ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRevision {
    /// Full SHA of the HEAD commit (40 characters)
    pub commit_hash: String,
    /// URL of the `origin` remote, if one is configured
    pub repo_url: Option<String>,
}

impl SourceRevision {
    /// Read HEAD and the origin URL of the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).context("Failed to discover git repository")?;

        let commit = repo
            .head()
            .context("Failed to resolve HEAD")?
            .peel_to_commit()
            .context("HEAD does not point at a commit")?;

        let repo_url = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(|u| u.to_string()));

        Ok(Self {
            commit_hash: commit.id().to_string(),
            repo_url,
        })
    }

    /// Like [`SourceRevision::open`], but a root outside version control is
    /// not an error: it is logged and yields `None`.
    pub fn discover<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(revision) => {
                tracing::info!(
                    "Source revision {} ({})",
                    revision.commit_hash,
                    revision.repo_url.as_deref().unwrap_or("no origin remote")
                );
                Some(revision)
            }
            Err(e) => {
                tracing::warn!(
                    "No git revision for {}, chunks carry no revision metadata: {:#}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, root: &Path, name: &str) -> git2::Oid {
        fs::write(root.join(name), "x = 1\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap()
    }

    #[test]
    fn test_open_reads_head_and_origin() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let oid = commit_file(&repo, temp_dir.path(), "a.py");
        repo.remote("origin", "https://example.com/org/repo.git")
            .unwrap();

        let revision = SourceRevision::open(temp_dir.path()).unwrap();
        assert_eq!(revision.commit_hash, oid.to_string());
        assert_eq!(revision.commit_hash.len(), 40);
        assert_eq!(
            revision.repo_url.as_deref(),
            Some("https://example.com/org/repo.git")
        );
    }

    #[test]
    fn test_open_without_origin() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        commit_file(&repo, temp_dir.path(), "a.py");

        let revision = SourceRevision::open(temp_dir.path()).unwrap();
        assert!(revision.repo_url.is_none());
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let oid = commit_file(&repo, temp_dir.path(), "a.py");
        fs::create_dir_all(temp_dir.path().join("src/pkg")).unwrap();

        let revision = SourceRevision::discover(temp_dir.path().join("src/pkg")).unwrap();
        assert_eq!(revision.commit_hash, oid.to_string());
    }

    #[test]
    fn test_repository_without_commits() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();

        assert!(SourceRevision::open(temp_dir.path()).is_err());
        assert!(SourceRevision::discover(temp_dir.path()).is_none());
    }
}
