// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use git2::{Repository, Signature};
use phrasetrail::adapters::{CollectingReporter, Extractor, MemoryTms, PatternExtractor, Tms};
use phrasetrail::config::PipelineConfig;
use phrasetrail::pipeline::{Conductor, LocalWorker, MemoryQueue, PipelineContext, StageRegistry};
use phrasetrail::query::PhraseQuery;
use phrasetrail::repository::{Database, RepoHandle, RepoRegistry};
use phrasetrail::snapshot::{FileFilter, FilterConfig, SnapshotFactory};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// `t("text")` or `t(:meta, "text")`
pub const PHRASE_PATTERN: &str = r#"t\((?::(?P<meta_key>\w+), )?"(?P<key>[^"]*)"\)"#;

/// Create an in-memory test database
pub async fn create_test_db() -> Database {
    Database::new(":memory:").await.unwrap()
}

/// Create an in-memory test database with the schema in place
pub async fn create_ready_db() -> Database {
    let db = create_test_db().await;
    db.init_schema().await.unwrap();
    db
}

/// Create an empty temporary git repository
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Write files, stage them and commit on HEAD
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> git2::Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

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

/// Commit exactly `files` (flat paths) on top of `parents` without moving HEAD
pub fn commit_tree(repo: &Repository, files: &[(&str, &[u8])], parents: &[git2::Oid], message: &str) -> git2::Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let mut builder = repo.treebuilder(None).unwrap();
    for (path, content) in files {
        let blob = repo.blob(content).unwrap();
        builder.insert(path, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let parents: Vec<git2::Commit> = parents.iter().map(|id| repo.find_commit(*id).unwrap()).collect();
    let parents: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(None, &sig, &sig, message, &tree, &parents).unwrap()
}

/// Remove a file from the repository and create a commit
pub fn remove_file_commit(repo: &Repository, path: &str, message: &str) -> git2::Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let full_path = repo.workdir().unwrap().join(path);
    if full_path.exists() {
        std::fs::remove_file(&full_path).unwrap();
    }

    let mut index = repo.index().unwrap();
    index.remove_path(std::path::Path::new(path)).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo.head().unwrap().peel_to_commit().unwrap();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent]).unwrap()
}

/// Filter accepting `.rb` files
pub fn ruby_filter() -> FileFilter {
    FileFilter::compile(&FilterConfig::Extension {
        extensions: vec!["rb".to_string()],
    })
    .unwrap()
}

/// Handle for a repository with one `.rb` pattern extractor
pub fn repo_handle(name: &str, path: PathBuf, locales: &[&str], tms: Arc<dyn Tms>) -> RepoHandle {
    let extractor: Arc<dyn Extractor> = Arc::new(PatternExtractor::new(PHRASE_PATTERN, ruby_filter()).unwrap());
    RepoHandle {
        name: name.to_string(),
        path,
        locales: locales.iter().map(|l| l.to_string()).collect(),
        filter: extractor.filter().clone(),
        extractors: vec![extractor],
        tms,
    }
}

/// A repository wired to a full in-process pipeline
pub struct Harness {
    pub dir: TempDir,
    pub repo_path: PathBuf,
    pub repo: Repository,
    pub db: Arc<Database>,
    pub tms: Arc<MemoryTms>,
    pub reporter: Arc<CollectingReporter>,
    pub queue: Arc<MemoryQueue>,
    pub conductor: Arc<Conductor>,
    pub query: PhraseQuery,
}

pub const REPO: &str = "app";

impl Harness {
    pub async fn new(locales: &[&str]) -> Self {
        Self::with_config(locales, PipelineConfig::default()).await
    }

    pub async fn with_config(locales: &[&str], config: PipelineConfig) -> Self {
        Self::with_backend(locales, config, |tms| tms as Arc<dyn Tms>).await
    }

    /// Like `with_config`, with the TMS the pipeline sees wrapped by `backend`
    pub async fn with_backend(
        locales: &[&str],
        config: PipelineConfig,
        backend: impl FnOnce(Arc<MemoryTms>) -> Arc<dyn Tms>,
    ) -> Self {
        let (dir, repo_path, repo) = create_test_repo();
        let db = Arc::new(create_ready_db().await);
        let tms = Arc::new(MemoryTms::new());
        let reporter = Arc::new(CollectingReporter::new());

        let mut repos = RepoRegistry::default();
        repos.insert(repo_handle(REPO, repo_path.clone(), locales, backend(tms.clone())));
        let repos = Arc::new(repos);
        let snapshots = Arc::new(SnapshotFactory::new(config.snapshot_cache_capacity));

        let ctx = Arc::new(PipelineContext::new(
            config,
            db.clone(),
            repos.clone(),
            snapshots.clone(),
            reporter.clone(),
        ));
        let queue = Arc::new(MemoryQueue::new());
        let conductor = Arc::new(Conductor::new(ctx, StageRegistry::standard(), queue.clone()));
        let query = PhraseQuery::new(db.clone(), repos, snapshots);

        Self {
            dir,
            repo_path,
            repo,
            db,
            tms,
            reporter,
            queue,
            conductor,
            query,
        }
    }

    pub fn worker(&self) -> LocalWorker {
        LocalWorker::new(self.conductor.clone(), self.queue.clone()).skip_delays()
    }

    /// Enqueue `commit` and drain the queue, bounded by `max_jobs`
    pub async fn process(&self, commit: git2::Oid, max_jobs: usize) -> usize {
        self.conductor.enqueue(REPO, &commit.to_string()).await.unwrap();
        self.worker().with_job_limit(max_jobs).run_until_idle().await.unwrap()
    }
}
