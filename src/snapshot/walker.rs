//! Tracked-blob collection for a start commit

use anyhow::{Context, Result};
use gix::bstr::ByteSlice;
use gix::objs::tree::EntryKind;
use rustc_hash::FxHashMap;
use std::path::Path;

use super::FileFilter;

/// Files at the start commit that pass the filter, with their blob ids
#[derive(Debug, Default)]
pub struct BlobSet {
    by_path: FxHashMap<String, git2::Oid>,
}

impl BlobSet {
    /// Blob id tracked at `path`, if the path is tracked
    pub fn blob_at(&self, path: &str) -> Option<git2::Oid> {
        self.by_path.get(path).copied()
    }

    /// Whether `path` is tracked with exactly this content
    pub fn tracks(&self, path: &str, blob: git2::Oid) -> bool {
        self.blob_at(path) == Some(blob)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Walk the tree of `commit_id` and keep every file `filter` accepts
pub fn collect_blobs(repo_path: &Path, commit_id: &str, filter: &FileFilter) -> Result<BlobSet> {
    let repo = gix::open(repo_path).context("Failed to open git repository")?;
    let id = gix::ObjectId::from_hex(commit_id.as_bytes())
        .with_context(|| format!("Not a full commit id: {}", commit_id))?;
    let commit = repo
        .find_object(id)
        .with_context(|| format!("Commit {} not found", commit_id))?
        .try_into_commit()
        .with_context(|| format!("{} is not a commit", commit_id))?;
    let tree = commit.tree().context("Failed to read commit tree")?;

    let mut recorder = gix::traverse::tree::Recorder::default();
    tree.traverse().breadthfirst(&mut recorder)?;

    let mut by_path = FxHashMap::default();
    for entry in recorder.records {
        if !matches!(entry.mode.kind(), EntryKind::Blob | EntryKind::BlobExecutable) {
            continue;
        }
        // Paths that are not UTF-8 cannot be named by any filter
        let Ok(path) = entry.filepath.to_str() else {
            continue;
        };
        if !filter.matches(path) {
            continue;
        }
        let blob = git2::Oid::from_bytes(entry.oid.as_bytes())?;
        by_path.insert(path.to_string(), blob);
    }

    Ok(BlobSet { by_path })
}
