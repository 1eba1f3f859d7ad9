// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use git2::{Repository, Signature};
use phrasetrail::model::Phrase;
use std::path::PathBuf;
use tempfile::TempDir;

/// `n` phrases spread over 50 files; every third one carries a meta key
pub fn generate_phrases(n: usize, text_suffix: &str) -> Vec<Phrase> {
    (0..n)
        .map(|i| {
            let phrase = Phrase::new(format!("phrase {}{}", i, text_suffix), format!("app/file_{}.rb", i % 50))
                .at_commit("c0");
            if i % 3 == 0 {
                phrase.with_meta_key(format!("key.{}", i))
            } else {
                phrase
            }
        })
        .collect()
}

/// Create a temporary git repository for benchmarks
pub fn create_bench_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Bench User").unwrap();
    config.set_str("user.email", "bench@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Add files and create a commit
pub fn add_commit(repo: &Repository, files: &[(String, Vec<u8>)], message: &str) -> git2::Oid {
    let sig = Signature::now("Bench User", "bench@example.com").unwrap();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        index.add_path(std::path::Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
}

/// Repository with `commits` commits, each rewriting a slice of `files` files
pub fn generate_history(files: usize, commits: usize) -> (TempDir, PathBuf, git2::Oid) {
    let (dir, path, repo) = create_bench_repo();
    let mut head = None;
    for c in 0..commits {
        let batch: Vec<(String, Vec<u8>)> = (0..files)
            .filter(|i| c == 0 || i % commits == c)
            .map(|i| {
                let path = format!("app/dir_{}/file_{}.rb", i % 20, i);
                let content = format!("t(\"phrase {} rev {}\")\n", i, c).into_bytes();
                (path, content)
            })
            .collect();
        head = Some(add_commit(&repo, &batch, &format!("Commit {}", c)));
    }
    let head = head.expect("at least one commit");
    (dir, path, head)
}
