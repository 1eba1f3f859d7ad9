use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::context::PipelineContext;
use super::push::phrases_at;
use super::stage::{advance_to, resolve_or_missing, Stage, StageOutcome};
use crate::adapters::{ErrorContext, ErrorReporter, Tms, TmsError};
use crate::model::{CommitRecord, Event, Phrase, Status};
use crate::repository::Datastore;

/// Import translations for every configured locale, then check whether
/// the TMS considers the commit done
pub struct PullStage;

/// Shared, read-only inputs of one locale import
struct LocaleImport {
    repo_name: String,
    commit_id: String,
    phrases: Arc<Vec<Phrase>>,
    tms: Arc<dyn Tms>,
    datastore: Arc<dyn Datastore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl LocaleImport {
    /// Translations imported for `locale`
    async fn run(&self, locale: &str) -> Result<usize> {
        let mut imported = 0;
        for phrase in self.phrases.iter() {
            match self.tms.lookup_translation(locale, phrase).await {
                Ok(Some(text)) => {
                    self.datastore
                        .add_or_update_translation(&self.repo_name, phrase, locale, &text)
                        .await?;
                    imported += 1;
                }
                Ok(None) => {}
                Err(TmsError::PhraseNotFound(id)) => self.reporter.report_warning(
                    &format!("phrase not found in TMS: {}", id),
                    &ErrorContext::new(&self.repo_name, &self.commit_id)
                        .file(&phrase.file)
                        .locale(locale),
                ),
                Err(e) => return Err(e).with_context(|| format!("Translation lookup failed for {}", locale)),
            }
        }
        Ok(imported)
    }
}

impl PullStage {
    /// Locales whose translations may have changed since the last import
    async fn locales_to_import(
        &self,
        ctx: &PipelineContext,
        record: &CommitRecord,
        locales: &[String],
        tms: &dyn Tms,
    ) -> Result<Vec<String>> {
        if !ctx.config.detect_translation_changes {
            return Ok(locales.to_vec());
        }
        let mut changed = Vec::new();
        for locale in locales {
            let checksum = tms.checksum_for(locale, &record.commit_id).await?;
            if ctx.checksums.changed(&record.repo_name, &record.commit_id, locale, &checksum) {
                changed.push(locale.clone());
            } else {
                debug!(repo = %record.repo_name, commit = record.short_id(), locale = %locale, "translations unchanged");
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl Stage for PullStage {
    fn name(&self) -> &'static str {
        "pull"
    }

    fn accepts(&self) -> &'static [Status] {
        &[Status::Pending, Status::Pulling]
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome> {
        let repo = ctx.repos.get(&record.repo_name)?;
        let Some(info) = resolve_or_missing(ctx, &repo, record).await? else {
            return Ok(StageOutcome::now());
        };

        let phrases = phrases_at(ctx, &repo, Some(info.id.as_str())).await?;
        if phrases.is_empty() {
            advance_to(ctx, record, Event::Translate).await?;
            return Ok(StageOutcome::now());
        }

        let locales = self
            .locales_to_import(ctx, record, &repo.locales, repo.tms.as_ref())
            .await?;
        let import = Arc::new(LocaleImport {
            repo_name: record.repo_name.clone(),
            commit_id: record.commit_id.clone(),
            phrases: Arc::new(phrases),
            tms: repo.tms.clone(),
            datastore: ctx.datastore.clone(),
            reporter: ctx.reporter.clone(),
        });

        let permits = Arc::new(Semaphore::new(ctx.config.pull_workers.max(1)));
        let mut tasks = JoinSet::new();
        for locale in locales {
            let import = import.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => import.run(&locale).await,
                    Err(e) => Err(e.into()),
                };
                (locale, result)
            });
        }

        // Every locale finishes before the record moves
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (locale, result) = joined.context("Locale import task panicked")?;
            match result {
                Ok(imported) => debug!(
                    repo = %record.repo_name,
                    commit = record.short_id(),
                    locale = %locale,
                    imported,
                    "imported"
                ),
                Err(e) => {
                    ctx.checksums.forget(&record.repo_name, &record.commit_id, &locale);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let status = repo.tms.status(&record.commit_id).await?;
        if record.status == Status::Pending {
            advance_to(ctx, record, Event::Pull).await?;
        }
        if status.fully_translated(&repo.locales) {
            advance_to(ctx, record, Event::Complete).await?;
            return Ok(StageOutcome::now());
        }

        info!(
            repo = %record.repo_name,
            commit = record.short_id(),
            delay_secs = ctx.config.pull_delay_secs,
            "translations outstanding"
        );
        Ok(StageOutcome::after(ctx.config.pull_delay()))
    }
}
