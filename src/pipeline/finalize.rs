use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::context::PipelineContext;
use super::stage::{advance_to, Stage, StageOutcome};
use crate::model::{CommitRecord, Event, Status};

/// Refresh locale counters and close the commit out with the TMS
pub struct FinalizeStage;

#[async_trait]
impl Stage for FinalizeStage {
    fn name(&self) -> &'static str {
        "finalize"
    }

    fn accepts(&self) -> &'static [Status] {
        &[Status::Pulled]
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome> {
        let repo = ctx.repos.get(&record.repo_name)?;
        let status = repo.tms.status(&record.commit_id).await?;

        for locale in &repo.locales {
            ctx.datastore
                .add_or_update_locale_counter(&record.repo_name, &record.commit_id, locale, status.locale_count(locale))
                .await
                .with_context(|| format!("Failed to update {} counter", locale))?;
        }

        if status.fully_translated(&repo.locales) {
            repo.tms.finalize(&record.commit_id).await?;
            advance_to(ctx, record, Event::Finalize).await?;
            return Ok(StageOutcome::now());
        }

        // Spread out re-polls so commits pulled together do not finalize together
        let secs = rand::random_range(ctx.config.finalize_delay_range());
        debug!(repo = %record.repo_name, commit = record.short_id(), delay_secs = secs, "not yet translated");
        Ok(StageOutcome::after(Duration::from_secs(secs)))
    }
}
