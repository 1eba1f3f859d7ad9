use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::context::PipelineContext;
use super::stage::{advance_to, resolve_or_missing, Stage, StageOutcome};
use crate::adapters::ErrorContext;
use crate::model::{CommitRecord, Event, Status};
use crate::repository::{fetch_all, owning_branch};

/// Fetch remotes, then record the commit's date and owning branch
pub struct FetchStage;

#[async_trait]
impl Stage for FetchStage {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn accepts(&self) -> &'static [Status] {
        &[Status::NotSeen, Status::NotFound]
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome> {
        let repo = ctx.repos.get(&record.repo_name)?;

        let path = repo.path.clone();
        let fetched = tokio::task::spawn_blocking(move || fetch_all(&path))
            .await
            .context("Fetch task panicked")?;
        match fetched {
            Ok(remotes) => debug!(repo = %repo.name, remotes, "fetched remotes"),
            // The commit may already be present locally; resolution below decides
            Err(e) => ctx.reporter.report_warning(
                &format!("fetch failed: {:#}", e),
                &ErrorContext::new(&record.repo_name, &record.commit_id),
            ),
        }

        let Some(info) = resolve_or_missing(ctx, &repo, record).await? else {
            return Ok(StageOutcome::now());
        };

        let path = repo.path.clone();
        let commit_id = info.id.clone();
        let branch = tokio::task::spawn_blocking(move || owning_branch(&path, &commit_id))
            .await
            .context("Branch lookup task panicked")??;

        record.commit_datetime = info.time;
        record.branch_name = branch;
        advance_to(ctx, record, Event::Fetch).await?;
        Ok(StageOutcome::now())
    }
}
