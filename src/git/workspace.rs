//! Mirror workspace lifecycle on the local filesystem.
//!
//! Each repository gets one directory under the configured temp root, named
//! after the repository.  The directory is wiped at the start of every
//! mirror run and left in place afterwards; the next request for the same
//! repository resets it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

/// Resolve the workspace directory for `repo_name` under `temp_root`.
///
/// Rejects names that would escape the temp root.
pub fn workspace_path(temp_root: &Path, repo_name: &str) -> Result<PathBuf> {
    anyhow::ensure!(
        valid_repo_name(repo_name),
        "repository name {repo_name:?} is not usable as a workspace directory"
    );
    Ok(temp_root.join(repo_name))
}

fn valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Remove a stale workspace and make sure the temp root exists.
///
/// Stale state from a prior run is deleted unconditionally so the clone
/// starts into an empty path; a directory that was never created is a no-op.
#[instrument(fields(path = %path.display()))]
pub async fn reset(path: &Path) -> Result<()> {
    if path.exists() {
        debug!("removing stale workspace");
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("failed to remove stale workspace: {}", path.display()))?;
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create workspace root: {}", parent.display()))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_name_under_root() {
        let path = workspace_path(Path::new("/tmp/repos"), "demo").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/repos/demo"));
    }

    #[test]
    fn rejects_traversal_names() {
        for bad in ["", ".", "..", "a/b", "..\\x", "a/../b"] {
            assert!(
                workspace_path(Path::new("/tmp/repos"), bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn accepts_ordinary_names() {
        for good in ["demo", "my-repo", "repo.git", "a_b", "v2.0"] {
            assert!(workspace_path(Path::new("/tmp/repos"), good).is_ok());
        }
    }

    #[tokio::test]
    async fn reset_removes_stale_contents() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("demo");
        std::fs::create_dir_all(workspace.join("nested")).unwrap();
        std::fs::write(workspace.join("nested/stale.txt"), "old").unwrap();

        reset(&workspace).await.unwrap();

        assert!(!workspace.exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn reset_on_missing_workspace_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("never-created");

        reset(&workspace).await.unwrap();

        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn reset_creates_missing_temp_root() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("deeper/root/demo");

        reset(&workspace).await.unwrap();

        assert!(workspace.parent().unwrap().is_dir());
    }
}
