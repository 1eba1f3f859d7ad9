// Snapshot integration tests
// Attribution is checked against real (temporary) git repositories

mod common;

use phrasetrail::adapters::MemoryTms;
use phrasetrail::snapshot::{
    compute_snapshot, FileFilter, NoopProgress, ProgressReporter, SnapshotFactory, SnapshotKey, WalkProgress,
};
use std::sync::Mutex;
use std::sync::Arc;

fn snapshot_at(path: &std::path::Path, commit: git2::Oid, filter: &FileFilter) -> phrasetrail::model::Snapshot {
    compute_snapshot(path, &commit.to_string(), filter, &NoopProgress).unwrap()
}

#[test]
fn test_single_commit_single_file() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(&repo, &[("app.rb", b"t(\"Hello\")\n")], "Add app");

    let snapshot = snapshot_at(&repo_path, c1, &common::ruby_filter());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("app.rb"), Some(c1.to_string().as_str()));
}

#[test]
fn test_unchanged_files_keep_their_origin() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(
        &repo,
        &[("a.rb", b"t(\"A\")"), ("lib/b.rb", b"t(\"B\")")],
        "Initial",
    );
    let c2 = common::add_commit(&repo, &[("lib/b.rb", b"t(\"B2\")")], "Edit b");
    let c3 = common::add_commit(&repo, &[("c.rb", b"t(\"C\")")], "Add c");

    let snapshot = snapshot_at(&repo_path, c3, &common::ruby_filter());
    assert_eq!(snapshot.get("a.rb"), Some(c1.to_string().as_str()));
    assert_eq!(snapshot.get("lib/b.rb"), Some(c2.to_string().as_str()));
    assert_eq!(snapshot.get("c.rb"), Some(c3.to_string().as_str()));

    // An older start commit only sees its own history
    let earlier = snapshot_at(&repo_path, c2, &common::ruby_filter());
    assert_eq!(earlier.len(), 2);
    assert!(!earlier.contains("c.rb"));
}

#[test]
fn test_filter_limits_tracked_files() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(
        &repo,
        &[("a.rb", b"x"), ("README.md", b"docs"), ("web/app.js", b"y")],
        "Initial",
    );

    let snapshot = snapshot_at(&repo_path, c1, &common::ruby_filter());
    let paths: Vec<&str> = snapshot.sorted().into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["a.rb"]);

    let everything = snapshot_at(&repo_path, c1, &FileFilter::All);
    assert_eq!(everything.len(), 3);
    for (path, _) in everything.iter() {
        assert!(FileFilter::All.matches(path));
    }
}

#[test]
fn test_deleted_file_is_absent() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    common::add_commit(&repo, &[("a.rb", b"a"), ("b.rb", b"b")], "Initial");
    let c2 = common::remove_file_commit(&repo, "b.rb", "Remove b");

    let snapshot = snapshot_at(&repo_path, c2, &common::ruby_filter());
    assert!(snapshot.contains("a.rb"));
    assert!(!snapshot.contains("b.rb"));
}

#[test]
fn test_renamed_file_belongs_to_rename_commit() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    common::add_commit(&repo, &[("old.rb", b"same content")], "Initial");
    common::remove_file_commit(&repo, "old.rb", "Drop old");
    let c3 = common::add_commit(&repo, &[("new.rb", b"same content")], "Recreate as new");

    let snapshot = snapshot_at(&repo_path, c3, &common::ruby_filter());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("new.rb"), Some(c3.to_string().as_str()));
}

#[test]
fn test_reverted_content_goes_to_earliest_producer() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(&repo, &[("a.rb", b"one")], "One");
    common::add_commit(&repo, &[("a.rb", b"two")], "Two");
    let c3 = common::add_commit(&repo, &[("a.rb", b"one")], "Back to one");

    let snapshot = snapshot_at(&repo_path, c3, &common::ruby_filter());
    assert_eq!(snapshot.get("a.rb"), Some(c1.to_string().as_str()));
}

#[test]
fn test_snapshot_is_deterministic() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    common::add_commit(&repo, &[("a.rb", b"a"), ("b.rb", b"b")], "Initial");
    common::add_commit(&repo, &[("b.rb", b"b2"), ("c.rb", b"c")], "More");
    let head = common::add_commit(&repo, &[("d/e.rb", b"e")], "Nested");

    let first = snapshot_at(&repo_path, head, &common::ruby_filter());
    let second = snapshot_at(&repo_path, head, &common::ruby_filter());
    assert_eq!(first, second);
    assert_eq!(first.sorted(), second.sorted());
    assert_eq!(first.len(), 4);
}

#[test]
fn test_merge_commit_unions_parent_diffs() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let base = common::commit_tree(&repo, &[("a.rb", b"a")], &[], "Base");
    let main = common::commit_tree(&repo, &[("a.rb", b"a"), ("main.rb", b"m")], &[base], "Main work");
    let side = common::commit_tree(&repo, &[("a.rb", b"a"), ("side.rb", b"s")], &[base], "Side work");
    let merge = common::commit_tree(
        &repo,
        &[("a.rb", b"a"), ("main.rb", b"m"), ("side.rb", b"s"), ("fix.rb", b"f")],
        &[main, side],
        "Merge side",
    );

    let snapshot = snapshot_at(&repo_path, merge, &common::ruby_filter());
    assert_eq!(snapshot.len(), 4);
    assert_eq!(snapshot.get("a.rb"), Some(base.to_string().as_str()));
    assert_eq!(snapshot.get("main.rb"), Some(main.to_string().as_str()));
    assert_eq!(snapshot.get("side.rb"), Some(side.to_string().as_str()));
    // Only the merge itself produced this content
    assert_eq!(snapshot.get("fix.rb"), Some(merge.to_string().as_str()));
}

/// Remembers what each walk reported
#[derive(Default)]
struct RecordingProgress {
    walks: Arc<Mutex<Vec<(usize, usize, usize, usize)>>>,
}

struct RecordingWalk {
    commits: usize,
    tracked: usize,
    walks: Arc<Mutex<Vec<(usize, usize, usize, usize)>>>,
}

impl ProgressReporter for RecordingProgress {
    fn start_walk(&self, _start_commit: &str, commits: usize, tracked: usize) -> Box<dyn WalkProgress> {
        Box::new(RecordingWalk {
            commits,
            tracked,
            walks: self.walks.clone(),
        })
    }
}

impl WalkProgress for RecordingWalk {
    fn commit_walked(&self, _claimed: usize) {}

    fn finish(&self, walked: usize, claimed: usize) {
        self.walks
            .lock()
            .unwrap()
            .push((self.commits, self.tracked, walked, claimed));
    }
}

#[test]
fn test_walk_progress_reports_early_stop() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    common::add_commit(&repo, &[("a.rb", b"a")], "Initial");
    common::add_commit(&repo, &[("README.md", b"docs")], "Docs");
    let head = common::add_commit(&repo, &[("notes.md", b"notes")], "More docs");

    let progress = RecordingProgress::default();
    compute_snapshot(&repo_path, &head.to_string(), &common::ruby_filter(), &progress).unwrap();

    // a.rb is claimed by the oldest commit, so the walk stops there
    assert_eq!(*progress.walks.lock().unwrap(), vec![(3, 1, 1, 1)]);
}

#[test]
fn test_restricted_paths() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(&repo, &[("a.rb", b"a"), ("b.rb", b"b")], "Initial");

    let filter = common::ruby_filter().restricted_to(&["b.rb".to_string(), "README.md".to_string()]);
    let snapshot = snapshot_at(&repo_path, c1, &filter);
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains("b.rb"));
}

#[tokio::test]
async fn test_factory_caches_by_commit_and_paths() {
    let (_dir, repo_path, repo) = common::create_test_repo();
    let c1 = common::add_commit(&repo, &[("a.rb", b"a"), ("b.rb", b"b")], "Initial");
    let handle = common::repo_handle("app", repo_path, &["de-DE"], Arc::new(MemoryTms::new()));
    let factory = SnapshotFactory::new(8);
    let id = c1.to_string();

    let full = factory.take_snapshot(&handle, &id, &[]).await.unwrap();
    let again = factory.take_snapshot(&handle, &id, &[]).await.unwrap();
    assert!(Arc::ptr_eq(&full, &again));
    assert_eq!(full.len(), 2);

    let narrowed = factory.take_snapshot(&handle, &id, &["a.rb".to_string()]).await.unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(factory.cache().len(), 2);
    assert!(factory.cache().contains(&SnapshotKey::new("app", &id, &["a.rb".to_string()])));
}
