//! Per-repository mirror locks.
//!
//! Two overlapping requests for the same repository name share one workspace
//! path; without exclusion the second request deletes the directory the
//! first is still cloning into.  Each repository name maps to one async
//! mutex, and a pipeline holds its guard from workspace reset through push.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Registry of per-repository-name locks.
///
/// Entries are never evicted; the registry grows with the set of distinct
/// repository names this node has mirrored, which stays small.
#[derive(Clone, Default)]
pub struct RepoLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `repo_name`, waiting at most `wait`.
    ///
    /// The returned guard keeps the repository exclusively held until it is
    /// dropped.
    pub async fn acquire(&self, repo_name: &str, wait: Duration) -> Result<OwnedMutexGuard<()>> {
        let entry = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(repo_name.to_string()).or_default())
        };

        match tokio::time::timeout(wait, entry.lock_owned()).await {
            Ok(guard) => {
                debug!(repo = repo_name, "repo lock acquired");
                Ok(guard)
            }
            Err(_) => {
                warn!(repo = repo_name, ?wait, "timed out waiting for repo lock");
                anyhow::bail!("timed out waiting for mirror lock on {repo_name}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn same_name_serializes() {
        let locks = RepoLocks::new();

        let guard = locks.acquire("demo", WAIT).await.unwrap();
        // A second acquire on the same name must time out while the first
        // guard is held.
        assert!(locks.acquire("demo", WAIT).await.is_err());

        drop(guard);
        locks.acquire("demo", WAIT).await.unwrap();
    }

    #[tokio::test]
    async fn different_names_do_not_block() {
        let locks = RepoLocks::new();

        let _a = locks.acquire("repo-a", WAIT).await.unwrap();
        let _b = locks.acquire("repo-b", WAIT).await.unwrap();
    }

    #[tokio::test]
    async fn waiter_proceeds_once_holder_releases() {
        let locks = RepoLocks::new();

        let guard = locks.acquire("demo", WAIT).await.unwrap();

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire("demo", Duration::from_secs(5)).await })
        };

        // Give the contender time to start waiting, then release.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        contender.await.unwrap().unwrap();
    }
}
