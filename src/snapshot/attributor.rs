//! Attribute tracked file content to the commit that introduced it

use anyhow::{Context, Result};
use git2::{Oid, Repository, Sort};
use rustc_hash::FxHashMap;
use std::path::Path;

use super::progress::ProgressReporter;
use super::walker::BlobSet;
use crate::model::Snapshot;
use crate::repository::diff_against_parents;

/// Ancestors of `start`, oldest first
fn ancestry(repo: &Repository, start: Oid) -> Result<Vec<Oid>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push(start)?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
    Ok(revwalk.collect::<Result<Vec<_>, _>>()?)
}

/// Walk history up to `start_commit` and claim each tracked path for the
/// first commit whose diff produced the tracked blob at that path.
///
/// Claims are never overwritten. The walk stops early once every tracked
/// path has an owner.
pub fn attribute(
    repo_path: &Path,
    start_commit: &str,
    tracked: &BlobSet,
    progress: &dyn ProgressReporter,
) -> Result<Snapshot> {
    let mut claimed: FxHashMap<String, String> = FxHashMap::default();
    if tracked.is_empty() {
        return Ok(Snapshot::from(claimed));
    }

    let repo = Repository::open(repo_path).context("Failed to open git repository")?;
    let start = Oid::from_str(start_commit)?;
    let commits = ancestry(&repo, start)?;

    let walk = progress.start_walk(start_commit, commits.len(), tracked.len());
    let mut walked = 0;
    for oid in commits {
        let commit = repo.find_commit(oid)?;
        for changed in diff_against_parents(&repo, &commit)? {
            if claimed.contains_key(&changed.path) || !tracked.tracks(&changed.path, changed.blob_id) {
                continue;
            }
            claimed.insert(changed.path, oid.to_string());
        }
        walked += 1;
        walk.commit_walked(claimed.len());
        if claimed.len() == tracked.len() {
            break;
        }
    }
    walk.finish(walked, claimed.len());

    Ok(Snapshot::from(claimed))
}
