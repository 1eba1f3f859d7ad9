use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use super::context::PipelineContext;
use super::queue::Queue;
use super::stage::{persist, StageRegistry};
use crate::model::{CommitRecord, Job, FINISHED_STATUS};
use crate::repository::{resolve_commit, ResolveError};

/// Picks the stage for a record, runs it, and schedules the next pass
pub struct Conductor {
    ctx: Arc<PipelineContext>,
    stages: StageRegistry,
    queue: Arc<dyn Queue>,
}

impl Conductor {
    pub fn new(ctx: Arc<PipelineContext>, stages: StageRegistry, queue: Arc<dyn Queue>) -> Self {
        Self { ctx, stages, queue }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Stored record, or a NOT_FOUND placeholder that is not persisted
    pub async fn lookup(&self, repo_name: &str, commit_id: &str) -> Result<CommitRecord> {
        Ok(self
            .ctx
            .datastore
            .lookup_commit_record(repo_name, commit_id)
            .await?
            .unwrap_or_else(|| CommitRecord::not_found(repo_name, commit_id)))
    }

    /// Record for `rev` after resolving it to a full commit id
    pub async fn status(&self, repo_name: &str, rev: &str) -> Result<CommitRecord> {
        let commit_id = self.canonical_id(repo_name, rev).await?;
        self.lookup(repo_name, &commit_id).await
    }

    /// Full commit id for `rev`, or `rev` itself when it cannot be resolved
    async fn canonical_id(&self, repo_name: &str, rev: &str) -> Result<String> {
        let repo = self.ctx.repos.get(repo_name)?;
        let path = repo.path.clone();
        let owned = rev.to_string();
        let resolved = tokio::task::spawn_blocking(move || resolve_commit(&path, &owned))
            .await
            .context("Commit resolution task panicked")?;
        match resolved {
            Ok(info) => Ok(info.id),
            // Fetch marks it MISSING
            Err(ResolveError::NotFound(_)) => Ok(rev.to_string()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the record if needed and queue its first job
    pub async fn enqueue(&self, repo_name: &str, rev: &str) -> Result<Job> {
        let commit_id = self.canonical_id(repo_name, rev).await?;
        let record = match self.ctx.datastore.lookup_commit_record(repo_name, &commit_id).await? {
            Some(record) => record,
            None => {
                let record = CommitRecord::new(repo_name, &commit_id);
                persist(&self.ctx, &record).await?;
                record
            }
        };

        let job = Job::for_record(&record).on_queue(&self.ctx.config.default_queue);
        self.queue.enqueue(job.clone()).await?;
        Ok(job)
    }

    /// Run the stage that claims `record`; returns the follow-up job, if any
    pub async fn advance(&self, mut record: CommitRecord) -> Result<Option<Job>> {
        let Some(stage) = self.stages.for_record(&record) else {
            debug!(repo = %record.repo_name, commit = record.short_id(), status = %record.status, "no stage claims record");
            return Ok(None);
        };

        let outcome = stage
            .execute(&self.ctx, &mut record)
            .await
            .with_context(|| format!("{} stage failed for {}@{}", stage.name(), record.repo_name, record.short_id()))?;

        if record.status == FINISHED_STATUS || record.status.is_terminal() {
            return Ok(None);
        }

        let mut job = Job::for_record(&record).on_queue(
            outcome
                .queue
                .unwrap_or_else(|| self.ctx.config.default_queue.clone()),
        );
        if let Some(delay) = outcome.delay {
            job = job.with_delay(delay);
        }
        self.queue.enqueue(job.clone()).await?;
        Ok(Some(job))
    }
}
