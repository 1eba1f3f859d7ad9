//! Stage seam and the ordered stage registry

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::context::PipelineContext;
use super::{ExtractStage, FetchStage, FinalizeStage, PullStage, PushStage};
use crate::model::{CommitRecord, Event, Status};
use crate::repository::{resolve_commit, CommitInfo, RepoHandle, ResolveError};

/// What a stage asks of the next pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutcome {
    pub delay: Option<Duration>,
    pub queue: Option<String>,
}

impl StageOutcome {
    pub fn now() -> Self {
        Self::default()
    }

    pub fn after(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            queue: None,
        }
    }
}

/// One step of commit processing
///
/// `execute` must tolerate being re-run after a crash that happened
/// between its side effect and persisting the record.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Statuses this stage claims
    fn accepts(&self) -> &'static [Status];

    fn accepts_record(&self, record: &CommitRecord) -> bool {
        self.accepts().contains(&record.status)
    }

    async fn execute(&self, ctx: &PipelineContext, record: &mut CommitRecord) -> Result<StageOutcome>;
}

/// Stages in dispatch order; no two claim the same status
pub struct StageRegistry {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Result<Self> {
        for status in Status::ALL {
            let claimants: Vec<&str> = stages
                .iter()
                .filter(|s| s.accepts().contains(&status))
                .map(|s| s.name())
                .collect();
            if claimants.len() > 1 {
                bail!("status {} is claimed by several stages: {}", status, claimants.join(", "));
            }
        }
        Ok(Self { stages })
    }

    /// Fetch, Extract, Push, Pull, Finalize
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Arc::new(FetchStage),
                Arc::new(ExtractStage),
                Arc::new(PushStage),
                Arc::new(PullStage),
                Arc::new(FinalizeStage),
            ],
        }
    }

    /// The stage claiming `record`, if any
    pub fn for_record(&self, record: &CommitRecord) -> Option<&Arc<dyn Stage>> {
        self.stages.iter().find(|stage| stage.accepts_record(record))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

pub(crate) async fn persist(ctx: &PipelineContext, record: &CommitRecord) -> Result<()> {
    ctx.datastore
        .add_or_update_commit_record(record)
        .await
        .with_context(|| format!("Failed to persist {}@{}", record.repo_name, record.short_id()))
}

/// Fire `event` and persist the record
pub(crate) async fn advance_to(ctx: &PipelineContext, record: &mut CommitRecord, event: Event) -> Result<()> {
    let from = record.status;
    record.transition(event)?;
    persist(ctx, record).await?;
    info!(
        repo = %record.repo_name,
        commit = record.short_id(),
        "{} -> {}",
        from,
        record.status
    );
    Ok(())
}

/// Resolve the record's commit, or mark it MISSING when it no longer exists
pub(crate) async fn resolve_or_missing(
    ctx: &PipelineContext,
    repo: &RepoHandle,
    record: &mut CommitRecord,
) -> Result<Option<CommitInfo>> {
    let path = repo.path.clone();
    let commit_id = record.commit_id.clone();
    let resolved = tokio::task::spawn_blocking(move || resolve_commit(&path, &commit_id))
        .await
        .context("Commit resolution task panicked")?;

    match resolved {
        Ok(info) => Ok(Some(info)),
        Err(ResolveError::NotFound(_)) => {
            advance_to(ctx, record, Event::Missing).await?;
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to resolve {}", record.commit_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Claims(&'static str, &'static [Status]);

    #[async_trait]
    impl Stage for Claims {
        fn name(&self) -> &'static str {
            self.0
        }

        fn accepts(&self) -> &'static [Status] {
            self.1
        }

        async fn execute(&self, _ctx: &PipelineContext, _record: &mut CommitRecord) -> Result<StageOutcome> {
            Ok(StageOutcome::now())
        }
    }

    #[test]
    fn test_standard_registry_partitions_live_statuses() {
        let registry = StageRegistry::standard();
        let mut record = CommitRecord::new("app", "c1");
        for status in Status::ALL {
            record.status = status;
            let stage = registry.for_record(&record).map(|s| s.name());
            match status {
                Status::NotSeen | Status::NotFound => assert_eq!(stage, Some("fetch")),
                Status::Fetched => assert_eq!(stage, Some("extract")),
                Status::Untranslated => assert_eq!(stage, Some("push")),
                Status::Pending | Status::Pulling => assert_eq!(stage, Some("pull")),
                Status::Pulled => assert_eq!(stage, Some("finalize")),
                Status::Translated | Status::Missing => assert_eq!(stage, None),
            }
        }
        assert_eq!(registry.names(), vec!["fetch", "extract", "push", "pull", "finalize"]);
    }

    #[test]
    fn test_overlapping_stages_rejected() {
        let overlapping: Vec<Arc<dyn Stage>> = vec![
            Arc::new(Claims("a", &[Status::NotSeen])),
            Arc::new(Claims("b", &[Status::NotSeen, Status::Fetched])),
        ];
        assert!(StageRegistry::new(overlapping).is_err());

        let disjoint: Vec<Arc<dyn Stage>> = vec![
            Arc::new(Claims("a", &[Status::NotSeen])),
            Arc::new(Claims("b", &[Status::Fetched])),
        ];
        assert!(StageRegistry::new(disjoint).is_ok());
    }
}
