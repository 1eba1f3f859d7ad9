mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cli::{Cli, Command};
use phrasetrail::adapters::{AdapterRegistry, TracingReporter};
use phrasetrail::config::Config;
use phrasetrail::model::{DiffEntry, PhraseDiff};
use phrasetrail::pipeline::{Conductor, LocalWorker, MemoryQueue, PipelineContext, StageRegistry};
use phrasetrail::query::PhraseQuery;
use phrasetrail::repository::{Database, Datastore, RepoRegistry};
use phrasetrail::snapshot::{SnapshotFactory, VerboseProgress};
use phrasetrail::util::format_datetime;

fn init_tracing(verbose: bool) {
    let default = if verbose { "phrasetrail=debug" } else { "phrasetrail=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_entries(marker: char, entries: &[DiffEntry]) {
    for entry in entries {
        let phrase = &entry.phrase;
        let line = phrase.line_number.map(|n| format!(":{}", n)).unwrap_or_default();
        match &entry.old_phrase {
            Some(old) => println!("{} {}{} {} (was {})", marker, phrase.file, line, phrase.key, old.key),
            None => println!("{} {}{} {}", marker, phrase.file, line, phrase.key),
        }
    }
}

fn print_diff(diff: &PhraseDiff) {
    if diff.is_empty() {
        println!("No phrase changes");
        return;
    }
    print_entries('+', &diff.added);
    print_entries('~', &diff.modified);
    print_entries('-', &diff.removed);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;

    let db_path = config.pipeline.database_path()?;
    tracing::debug!("Using datastore: {}", db_path.display());
    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    db.init_schema().await?;
    let datastore: Arc<dyn Datastore> = Arc::new(db);

    let adapters = AdapterRegistry::with_builtins();
    let repos = Arc::new(RepoRegistry::from_config(&config, &adapters)?);
    let snapshots = Arc::new(SnapshotFactory::with_progress(
        config.pipeline.snapshot_cache_capacity,
        Arc::new(VerboseProgress::new(cli.verbose)),
    ));

    let ctx = Arc::new(PipelineContext::new(
        config.pipeline.clone(),
        datastore.clone(),
        repos.clone(),
        snapshots.clone(),
        Arc::new(TracingReporter),
    ));
    let queue = Arc::new(MemoryQueue::new());
    let conductor = Arc::new(Conductor::new(ctx, StageRegistry::standard(), queue.clone()));
    let query = PhraseQuery::new(datastore, repos, snapshots);

    match cli.command {
        Command::Enqueue { repo, commit } => {
            let job = conductor.enqueue(&repo, &commit).await?;
            println!("{}", job.to_json()?);
        }
        Command::Process {
            repo,
            commit,
            no_delay,
            max_jobs,
        } => {
            let job = conductor.enqueue(&repo, &commit).await?;
            let mut worker = LocalWorker::new(conductor.clone(), queue.clone()).with_job_limit(max_jobs);
            if no_delay {
                worker = worker.skip_delays();
            }
            let ran = worker.run_until_idle().await?;
            let record = conductor.lookup(&repo, &job.commit_id).await?;
            println!("{} {} after {} jobs", record.commit_id, record.status, ran);
            if !queue.is_empty() {
                println!("{} jobs still queued", queue.len());
            }
        }
        Command::Status { repo, commit } => {
            let record = conductor.status(&repo, &commit).await?;
            println!("commit:   {}", record.commit_id);
            println!("status:   {}", record.status);
            println!("phrases:  {}", record.phrase_count);
            println!("date:     {}", format_datetime(record.commit_datetime));
            println!("branch:   {}", record.branch_name.as_deref().unwrap_or("-"));
        }
        Command::BranchStatus { repo, branch } => {
            let summary = query.branch_status(&repo, &branch).await?;
            let status = summary.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            println!("{} {} ({} commits)", summary.branch, status, summary.commits);
        }
        Command::Snapshot { repo, commit, paths } => {
            let (commit_id, snapshot) = query.snapshot(&repo, &commit, &paths).await?;
            eprintln!("{} tracked files at {}", snapshot.len(), commit_id);
            for (path, introduced) in snapshot.sorted() {
                println!("{}  {}", introduced, path);
            }
        }
        Command::Diff { repo, head, diff_point } => {
            print_diff(&query.diff(&repo, &head, &diff_point).await?);
        }
        Command::Show { repo, commit } => {
            print_diff(&query.show(&repo, &commit).await?);
        }
    }

    Ok(())
}
