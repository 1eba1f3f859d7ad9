//! Queue seam and the in-process queue/worker pair

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use super::conductor::Conductor;
use crate::model::Job;

#[async_trait]
pub trait Queue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<()>;
}

/// FIFO queue held in memory
#[derive(Default)]
pub struct MemoryQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs currently waiting, front first
    pub fn pending(&self) -> Vec<Job> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn enqueue(&self, job: Job) -> Result<()> {
        debug!(repo = %job.repo_name, commit = %job.commit_id, status = %job.status, delay = job.delay, queue = %job.queue_name, "enqueued");
        self.lock().push_back(job);
        Ok(())
    }
}

impl Job {
    /// Advance the commit this job names; returns the follow-up job
    pub async fn work(&self, conductor: &Conductor) -> Result<Option<Job>> {
        let record = conductor.lookup(&self.repo_name, &self.commit_id).await?;
        conductor.advance(record).await
    }
}

/// One lock per (repo, commit) so jobs for the same commit never overlap
#[derive(Default)]
struct CommitLocks {
    locks: Mutex<FxHashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl CommitLocks {
    fn get(&self, job: &Job) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry((job.repo_name.clone(), job.commit_id.clone()))
            .or_default()
            .clone()
    }

    /// Drop `lock`, and its map entry when no other job holds it
    fn release(&self, job: &Job, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        drop(lock);
        let key = (job.repo_name.clone(), job.commit_id.clone());
        if locks.get(&key).is_some_and(|held| Arc::strong_count(held) == 1) {
            locks.remove(&key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Drains a [`MemoryQueue`] through a [`Conductor`]
pub struct LocalWorker {
    conductor: Arc<Conductor>,
    queue: Arc<MemoryQueue>,
    concurrency: usize,
    honor_delays: bool,
    job_limit: Option<usize>,
    locks: Arc<CommitLocks>,
}

impl LocalWorker {
    pub fn new(conductor: Arc<Conductor>, queue: Arc<MemoryQueue>) -> Self {
        Self {
            conductor,
            queue,
            concurrency: 1,
            honor_delays: true,
            job_limit: None,
            locks: Arc::new(CommitLocks::default()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run delayed jobs immediately
    pub fn skip_delays(mut self) -> Self {
        self.honor_delays = false;
        self
    }

    /// Stop after this many jobs even if the queue is not empty
    pub fn with_job_limit(mut self, limit: usize) -> Self {
        self.job_limit = Some(limit);
        self
    }

    /// Work until the queue is empty (or the job limit is hit); returns jobs run
    pub async fn run_until_idle(&self) -> Result<usize> {
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        let mut started = 0;

        loop {
            while tasks.len() < self.concurrency && self.job_limit.is_none_or(|limit| started < limit) {
                let Some(job) = self.queue.pop() else {
                    break;
                };
                started += 1;
                tasks.spawn(self.run_job(job));
            }

            match tasks.join_next().await {
                Some(joined) => joined.context("Job task panicked")??,
                None => break,
            }
        }
        Ok(started)
    }

    fn run_job(&self, job: Job) -> impl std::future::Future<Output = Result<()>> + Send + use<> {
        let conductor = self.conductor.clone();
        let locks = self.locks.clone();
        let lock = locks.get(&job);
        let honor_delays = self.honor_delays;
        async move {
            let result = {
                let _guard = lock.lock().await;
                if honor_delays && job.delay > 0 {
                    tokio::time::sleep(job.delay_duration()).await;
                }
                job.work(&conductor).await
            };
            locks.release(&job, lock);
            result.map(|_| ())
        }
    }
}
