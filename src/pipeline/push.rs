use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::context::PipelineContext;
use super::stage::{advance_to, resolve_or_missing, Stage, StageOutcome};
use crate::diff::compare;
use crate::model::{CommitRecord, Event, Phrase, Snapshot, Status};
use crate::repository::RepoHandle;

/// Upload the phrases a commit added or modified to the TMS
pub struct PushStage;

/// Phrases visible at `commit_id`, or none for a missing parent
pub(crate) async fn phrases_at(
    ctx: &PipelineContext,
    repo: &RepoHandle,
    commit_id: Option<&str>,
) -> Result<Vec<Phrase>> {
    let snapshot = match commit_id {
        Some(id) => ctx.snapshots.take_snapshot(repo, id, &[]).await?,
        None => Arc::new(Snapshot::new()),
    };
    ctx.datastore.phrases_by_snapshot(&repo.name, &snapshot).await
}

#[async_trait]
impl Stage for PushStage {
    fn name(&self) -> &'static str {
        "push"
    }

    fn accepts(&self) -> &'static [Status] {
        &[Status::Untranslated]
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome> {
        let repo = ctx.repos.get(&record.repo_name)?;
        let Some(info) = resolve_or_missing(ctx, &repo, record).await? else {
            return Ok(StageOutcome::now());
        };

        let current = phrases_at(ctx, &repo, Some(info.id.as_str())).await?;
        let previous = phrases_at(ctx, &repo, info.first_parent()).await?;
        let changed = compare(&current, &previous).changed_phrases();

        if !changed.is_empty() {
            repo.tms
                .store_phrases(&changed, &record.commit_id)
                .await
                .with_context(|| format!("Failed to push phrases for {}", record.short_id()))?;
        }
        debug!(repo = %repo.name, commit = record.short_id(), pushed = changed.len(), "pushed");

        record.phrase_count = changed.len() as u64;
        advance_to(ctx, record, Event::Push).await?;
        Ok(StageOutcome::now())
    }
}
