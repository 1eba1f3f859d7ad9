//! Read-only phrase queries: snapshots, phrase sets and diffs

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::diff::compare;
use crate::model::{Phrase, PhraseDiff, Snapshot, Status};
use crate::repository::{resolve_commit, CommitInfo, Datastore, RepoHandle, RepoRegistry};
use crate::snapshot::SnapshotFactory;

/// Processing state of the commits recorded on one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStatus {
    pub branch: String,
    pub commits: usize,
    /// Weakest status among the commits; `None` when none is on the ordered scale
    pub status: Option<Status>,
}

pub struct PhraseQuery {
    datastore: Arc<dyn Datastore>,
    repos: Arc<RepoRegistry>,
    snapshots: Arc<SnapshotFactory>,
}

impl PhraseQuery {
    pub fn new(datastore: Arc<dyn Datastore>, repos: Arc<RepoRegistry>, snapshots: Arc<SnapshotFactory>) -> Self {
        Self {
            datastore,
            repos,
            snapshots,
        }
    }

    async fn resolve(&self, repo: &RepoHandle, rev: &str) -> Result<CommitInfo> {
        let path = repo.path.clone();
        let owned = rev.to_string();
        let info = tokio::task::spawn_blocking(move || resolve_commit(&path, &owned))
            .await
            .context("Commit resolution task panicked")?
            .with_context(|| format!("Cannot resolve {} in {}", rev, repo.name))?;
        Ok(info)
    }

    /// Snapshot of `rev`, narrowed to `paths` when given; also returns the full commit id
    pub async fn snapshot(&self, repo_name: &str, rev: &str, paths: &[String]) -> Result<(String, Arc<Snapshot>)> {
        let repo = self.repos.get(repo_name)?;
        let info = self.resolve(&repo, rev).await?;
        let snapshot = self.snapshots.take_snapshot(&repo, &info.id, paths).await?;
        Ok((info.id, snapshot))
    }

    async fn phrases_for(&self, repo: &RepoHandle, commit_id: &str) -> Result<Vec<Phrase>> {
        let snapshot = self.snapshots.take_snapshot(repo, commit_id, &[]).await?;
        self.datastore.phrases_by_snapshot(&repo.name, &snapshot).await
    }

    /// Every stored phrase visible at `rev`
    pub async fn phrases_at(&self, repo_name: &str, rev: &str) -> Result<Vec<Phrase>> {
        let repo = self.repos.get(repo_name)?;
        let info = self.resolve(&repo, rev).await?;
        self.phrases_for(&repo, &info.id).await
    }

    /// What changed going from `diff_point` to `head`
    pub async fn diff(&self, repo_name: &str, head: &str, diff_point: &str) -> Result<PhraseDiff> {
        let repo = self.repos.get(repo_name)?;
        let head = self.resolve(&repo, head).await?;
        let base = self.resolve(&repo, diff_point).await?;
        let new = self.phrases_for(&repo, &head.id).await?;
        let old = self.phrases_for(&repo, &base.id).await?;
        Ok(compare(&new, &old))
    }

    /// What `rev` changed relative to its first parent (everything, for a root)
    pub async fn show(&self, repo_name: &str, rev: &str) -> Result<PhraseDiff> {
        let repo = self.repos.get(repo_name)?;
        let info = self.resolve(&repo, rev).await?;
        let new = self.phrases_for(&repo, &info.id).await?;
        let old = match info.first_parent() {
            Some(parent) => self.phrases_for(&repo, parent).await?,
            None => Vec::new(),
        };
        Ok(compare(&new, &old))
    }

    /// The branch is only as far along as its least processed commit
    pub async fn branch_status(&self, repo_name: &str, branch: &str) -> Result<BranchStatus> {
        let repo = self.repos.get(repo_name)?;
        let records = self.datastore.commit_records_for_branch(&repo.name, branch).await?;
        Ok(BranchStatus {
            branch: branch.to_string(),
            commits: records.len(),
            status: Status::weakest(records.iter().map(|r| r.status)),
        })
    }
}
