use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::context::PipelineContext;
use super::stage::{advance_to, resolve_or_missing, Stage, StageOutcome};
use crate::adapters::ErrorContext;
use crate::model::{CommitRecord, Event, Phrase, Status};
use crate::repository::{changed_file_contents, CommitInfo, RepoHandle};

/// Extract phrases from the files a commit changed and store them
pub struct ExtractStage;

/// Phrases found in one commit plus the files that failed to parse
#[derive(Default)]
struct Extraction {
    phrases: Vec<Phrase>,
    failures: Vec<(String, String)>,
}

fn extract_commit(repo: &RepoHandle, info: &CommitInfo) -> Result<Extraction> {
    let files = changed_file_contents(&repo.path, &info.id)?;
    let mut out = Extraction::default();

    for (path, contents) in files {
        let Some(extractor) = repo.extractor_for(&path) else {
            continue;
        };
        match extractor.extract_each_phrase(&contents) {
            Ok(found) => {
                out.phrases.extend(found.into_iter().map(|(fragment, line)| {
                    let mut phrase = fragment.into_phrase(&path, &info.id, line);
                    phrase.author_name = info.author_name.clone();
                    phrase.author_email = info.author_email.clone();
                    phrase
                }));
            }
            Err(e) => out.failures.push((path, e.to_string())),
        }
    }
    Ok(out)
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn accepts(&self) -> &'static [Status] {
        &[Status::Fetched]
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome> {
        let repo = ctx.repos.get(&record.repo_name)?;
        let Some(info) = resolve_or_missing(ctx, &repo, record).await? else {
            return Ok(StageOutcome::now());
        };

        let worker_repo = Arc::clone(&repo);
        let extraction = tokio::task::spawn_blocking(move || extract_commit(&worker_repo, &info))
            .await
            .context("Extraction task panicked")??;

        for (file, message) in &extraction.failures {
            ctx.reporter.report_error(
                message,
                &ErrorContext::new(&record.repo_name, &record.commit_id).file(file),
            );
        }

        ctx.datastore
            .store_phrases(&record.repo_name, &extraction.phrases)
            .await
            .context("Failed to store extracted phrases")?;
        debug!(
            repo = %record.repo_name,
            commit = record.short_id(),
            phrases = extraction.phrases.len(),
            failures = extraction.failures.len(),
            "extracted"
        );

        record.phrase_count = extraction.phrases.len() as u64;
        advance_to(ctx, record, Event::Extract).await?;
        Ok(StageOutcome::now())
    }
}
