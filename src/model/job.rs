use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CommitRecord, Status};

/// Queue used when a stage does not ask for a specific one
pub const DEFAULT_QUEUE: &str = "commits";

/// A unit of work handed to an external queue: "advance this commit again"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub repo_name: String,
    pub commit_id: String,
    /// Status the record had when the job was created
    pub status: Status,
    pub queue_name: String,
    /// Seconds to wait before the job becomes runnable
    pub delay: u64,
}

impl Job {
    pub fn new(repo_name: impl Into<String>, commit_id: impl Into<String>, status: Status) -> Self {
        Self {
            repo_name: repo_name.into(),
            commit_id: commit_id.into(),
            status,
            queue_name: DEFAULT_QUEUE.to_string(),
            delay: 0,
        }
    }

    pub fn for_record(record: &CommitRecord) -> Self {
        Self::new(&record.repo_name, &record.commit_id, record.status)
    }

    pub fn on_queue(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay.as_secs();
        self
    }

    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
