//! Content-attribution snapshots
//!
//! A snapshot maps every tracked file at a start commit to the commit
//! that introduced its current content. It is built in two passes:
//!
//! - **walker**: gix tree walk of the start commit, keeping the files the
//!   repository's filter accepts (path -> blob id)
//! - **attributor**: git2 history walk, oldest first, claiming each path
//!   for the first commit whose diff produced that exact blob
//!
//! [`SnapshotFactory`] runs both off the async runtime and memoizes the
//! result per (repo, commit, path list).

mod attributor;
mod cache;
mod filter;
mod progress;
mod walker;

pub use attributor::attribute;
pub use cache::{SnapshotCache, SnapshotKey};
pub use filter::{FileFilter, FilterConfig};
pub use progress::{IndicatifProgress, NoopProgress, ProgressReporter, VerboseProgress, WalkProgress};
pub use walker::{collect_blobs, BlobSet};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::model::Snapshot;
use crate::repository::RepoHandle;

/// Compute a snapshot without caching. Blocking.
pub fn compute_snapshot(
    repo_path: &Path,
    commit_id: &str,
    filter: &FileFilter,
    progress: &dyn ProgressReporter,
) -> Result<Snapshot> {
    let started = Instant::now();
    let tracked = collect_blobs(repo_path, commit_id, filter)?;
    debug!(commit = commit_id, files = tracked.len(), elapsed = ?started.elapsed(), "collected tracked blobs");

    let started = Instant::now();
    let snapshot = attribute(repo_path, commit_id, &tracked, progress)?;
    debug!(commit = commit_id, attributed = snapshot.len(), elapsed = ?started.elapsed(), "attributed history");
    Ok(snapshot)
}

/// Cached snapshot source shared by stages and read-only queries
pub struct SnapshotFactory {
    cache: SnapshotCache,
    progress: Arc<dyn ProgressReporter>,
}

impl SnapshotFactory {
    pub fn new(capacity: usize) -> Self {
        Self::with_progress(capacity, Arc::new(NoopProgress))
    }

    pub fn with_progress(capacity: usize, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            cache: SnapshotCache::new(capacity),
            progress,
        }
    }

    /// Snapshot of `commit_id` (a full commit id) for the repository's
    /// tracked files, narrowed to `paths` when that list is non-empty
    pub async fn take_snapshot(
        &self,
        repo: &RepoHandle,
        commit_id: &str,
        paths: &[String],
    ) -> Result<Arc<Snapshot>> {
        let key = SnapshotKey::new(&repo.name, commit_id, paths);
        let repo_path = repo.path.clone();
        let commit = commit_id.to_string();
        let filter = repo.filter.restricted_to(paths);
        let progress = self.progress.clone();

        self.cache
            .fetch(&key, || async move {
                tokio::task::spawn_blocking(move || {
                    compute_snapshot(&repo_path, &commit, &filter, progress.as_ref())
                })
                .await
                .context("Snapshot task panicked")?
            })
            .await
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}
