//! Datastore trait for persistence abstraction
//!
//! Decouples the pipeline from database implementation details. The
//! store owns phrases, commit records, imported translations and the
//! per-locale counters; nothing here assumes it lives in process.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{CommitRecord, Phrase, Snapshot};

/// Translated phrase count for one locale of one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCounter {
    pub locale: String,
    pub translated_count: u64,
}

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn lookup_commit_record(&self, repo_name: &str, commit_id: &str) -> Result<Option<CommitRecord>>;

    /// Insert the record, or overwrite the stored one for the same (repo, commit)
    async fn add_or_update_commit_record(&self, record: &CommitRecord) -> Result<()>;

    async fn commit_records_for_branch(&self, repo_name: &str, branch_name: &str) -> Result<Vec<CommitRecord>>;

    /// Store a phrase; storing the same phrase again is a no-op
    async fn store_phrase(&self, repo_name: &str, phrase: &Phrase) -> Result<()>;

    async fn store_phrases(&self, repo_name: &str, phrases: &[Phrase]) -> Result<()> {
        for phrase in phrases {
            self.store_phrase(repo_name, phrase).await?;
        }
        Ok(())
    }

    /// Phrases stored for exactly the (file, commit) pairs of `snapshot`
    async fn phrases_by_snapshot(&self, repo_name: &str, snapshot: &Snapshot) -> Result<Vec<Phrase>>;

    async fn add_or_update_translation(
        &self,
        repo_name: &str,
        phrase: &Phrase,
        locale: &str,
        translation: &str,
    ) -> Result<()>;

    async fn translation_for(&self, repo_name: &str, phrase: &Phrase, locale: &str) -> Result<Option<String>>;

    async fn add_or_update_locale_counter(
        &self,
        repo_name: &str,
        commit_id: &str,
        locale: &str,
        translated_count: u64,
    ) -> Result<()>;

    async fn locale_counters_for(&self, repo_name: &str, commit_id: &str) -> Result<Vec<LocaleCounter>>;
}
