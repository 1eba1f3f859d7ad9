//! Synchronous git operations
//!
//! Every function opens its own `git2::Repository`, so callers on
//! different threads never share revision-walk state. Run these from
//! `spawn_blocking` when on the async runtime.

use anyhow::{Context, Result};
use git2::{BranchType, Commit, Diff, ErrorCode, Oid, Repository};
use std::path::Path;

use crate::util::datetime_from_unix;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The revision no longer names a commit (rewritten or deleted history)
    #[error("commit not found: {0}")]
    NotFound(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Owned summary of a resolved commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub time: Option<OffsetDateTime>,
}

impl CommitInfo {
    fn from_commit(commit: &Commit<'_>) -> Self {
        let author = commit.author();
        Self {
            id: commit.id().to_string(),
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
            author_name: author.name().map(str::to_string),
            author_email: author.email().map(str::to_string),
            time: datetime_from_unix(commit.time().seconds()),
        }
    }

    pub fn first_parent(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }
}

/// A file whose content was introduced by a commit
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub blob_id: Oid,
}

pub fn open(repo_path: &Path) -> Result<Repository, ResolveError> {
    Ok(Repository::open(repo_path)?)
}

fn find_commit<'r>(repo: &'r Repository, rev: &str) -> Result<Commit<'r>, ResolveError> {
    let object = repo.revparse_single(rev).map_err(|e| match e.code() {
        ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous => {
            ResolveError::NotFound(rev.to_string())
        }
        _ => ResolveError::Git(e),
    })?;
    object
        .peel_to_commit()
        .map_err(|_| ResolveError::NotFound(rev.to_string()))
}

/// Resolve a ref or commit id to a concrete commit
pub fn resolve_commit(repo_path: &Path, rev: &str) -> Result<CommitInfo, ResolveError> {
    let repo = open(repo_path)?;
    let commit = find_commit(&repo, rev)?;
    Ok(CommitInfo::from_commit(&commit))
}

/// Fetch every configured remote using its default refspecs
pub fn fetch_all(repo_path: &Path) -> Result<usize> {
    let repo = Repository::open(repo_path).context("Failed to open git repository")?;
    let remotes = repo.remotes()?;
    let mut fetched = 0;
    for name in remotes.iter().flatten() {
        let mut remote = repo.find_remote(name)?;
        remote
            .fetch(&[] as &[&str], None, None)
            .with_context(|| format!("Failed to fetch remote {}", name))?;
        fetched += 1;
    }
    Ok(fetched)
}

/// Remote branch that contains `commit_id`
///
/// The remote's default branch wins when it contains the commit;
/// otherwise the first remote branch (by name) that does.
pub fn owning_branch(repo_path: &Path, commit_id: &str) -> Result<Option<String>> {
    let repo = Repository::open(repo_path).context("Failed to open git repository")?;
    let target = Oid::from_str(commit_id)?;

    let contains = |tip: Oid| -> bool {
        tip == target || repo.graph_descendant_of(tip, target).unwrap_or(false)
    };

    let default_branch = repo
        .find_reference("refs/remotes/origin/HEAD")
        .ok()
        .and_then(|r| r.symbolic_target().map(str::to_string))
        .and_then(|name| repo.find_reference(&name).ok())
        .and_then(|r| {
            let tip = r.target()?;
            let name = r.shorthand()?.to_string();
            Some((name, tip))
        });
    if let Some((name, tip)) = default_branch {
        if contains(tip) {
            return Ok(Some(name));
        }
    }

    let mut branches = Vec::new();
    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        let reference = branch.get();
        if reference.symbolic_target().is_some() {
            continue;
        }
        if let (Some(name), Some(tip)) = (reference.shorthand(), reference.target()) {
            branches.push((name.to_string(), tip));
        }
    }
    branches.sort();
    Ok(branches
        .into_iter()
        .find(|(_, tip)| contains(*tip))
        .map(|(name, _)| name))
}

fn new_side_entries(diff: &Diff<'_>, out: &mut Vec<ChangedFile>) {
    for delta in diff.deltas() {
        let new_file = delta.new_file();
        if new_file.id().is_zero() {
            continue;
        }
        if let Some(path) = new_file.path().and_then(|p| p.to_str()) {
            out.push(ChangedFile {
                path: path.to_string(),
                blob_id: new_file.id(),
            });
        }
    }
}

/// New-side blobs of a commit's diff against each parent (empty tree for a root)
pub(crate) fn diff_against_parents(repo: &Repository, commit: &Commit<'_>) -> Result<Vec<ChangedFile>, git2::Error> {
    let tree = commit.tree()?;
    let mut changed = Vec::new();
    if commit.parent_count() == 0 {
        let diff = repo.diff_tree_to_tree(None, Some(&tree), None)?;
        new_side_entries(&diff, &mut changed);
    } else {
        for parent in commit.parents() {
            let parent_tree = parent.tree()?;
            let diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?;
            new_side_entries(&diff, &mut changed);
        }
    }
    Ok(changed)
}

/// Files whose content `commit_id` introduced, with their bytes
pub fn changed_file_contents(repo_path: &Path, commit_id: &str) -> Result<Vec<(String, Vec<u8>)>, ResolveError> {
    let repo = open(repo_path)?;
    let commit = find_commit(&repo, commit_id)?;
    let mut seen = rustc_hash::FxHashSet::default();
    let mut files = Vec::new();
    for changed in diff_against_parents(&repo, &commit)? {
        if !seen.insert(changed.path.clone()) {
            continue;
        }
        let blob = repo.find_blob(changed.blob_id)?;
        files.push((changed.path, blob.content().to_vec()));
    }
    Ok(files)
}
