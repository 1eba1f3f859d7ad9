use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use super::status::{Event, Status, TransitionError};

/// Processing state of one commit in one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repo_name: String,
    pub commit_id: String,
    pub phrase_count: u64,
    pub status: Status,
    #[serde(with = "time::serde::timestamp::option")]
    pub commit_datetime: Option<OffsetDateTime>,
    pub branch_name: Option<String>,
}

impl CommitRecord {
    /// A record for a commit the pipeline has not touched yet
    pub fn new(repo_name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            commit_id: commit_id.into(),
            phrase_count: 0,
            status: Status::NotSeen,
            commit_datetime: None,
            branch_name: None,
        }
    }

    /// Placeholder returned by lookups that found no stored record
    pub fn not_found(repo_name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            status: Status::NotFound,
            ..Self::new(repo_name, commit_id)
        }
    }

    /// Fire `event`, leaving the status untouched if it is not allowed
    pub fn transition(&mut self, event: Event) -> Result<Status, TransitionError> {
        let next = self.status.next(event)?;
        debug!(
            repo = %self.repo_name,
            commit = %self.commit_id,
            "{} -> {} ({})",
            self.status,
            next,
            event
        );
        self.status = next;
        Ok(next)
    }

    pub fn short_id(&self) -> &str {
        self.commit_id.get(..8).unwrap_or(&self.commit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_not_seen() {
        let record = CommitRecord::new("app", "abc123");
        assert_eq!(record.status, Status::NotSeen);
        assert_eq!(record.phrase_count, 0);
    }

    #[test]
    fn test_rejected_transition_keeps_status() {
        let mut record = CommitRecord::new("app", "abc123");
        assert!(record.transition(Event::Finalize).is_err());
        assert_eq!(record.status, Status::NotSeen);

        record.transition(Event::Fetch).unwrap();
        assert_eq!(record.status, Status::Fetched);
    }

    #[test]
    fn test_short_id() {
        let record = CommitRecord::new("app", "0123456789abcdef");
        assert_eq!(record.short_id(), "01234567");
        assert_eq!(CommitRecord::new("app", "abc").short_id(), "abc");
    }
}
