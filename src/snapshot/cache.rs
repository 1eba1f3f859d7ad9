//! Memoized snapshots keyed by (repo, commit, path list)

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHasher};
use std::collections::VecDeque;
use std::future::Future;
use std::hash::Hasher;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::model::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub repo_name: String,
    pub commit_id: String,
    /// Hex digest of the sorted path list
    pub paths_digest: String,
}

impl SnapshotKey {
    pub fn new(repo_name: &str, commit_id: &str, paths: &[String]) -> Self {
        let mut sorted: Vec<&str> = paths.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut hasher = FxHasher::default();
        for path in sorted {
            hasher.write(path.as_bytes());
            hasher.write_u8(0);
        }
        Self {
            repo_name: repo_name.to_string(),
            commit_id: commit_id.to_string(),
            paths_digest: hex::encode(hasher.finish().to_be_bytes()),
        }
    }
}

type Slot = Arc<OnceCell<Arc<Snapshot>>>;

#[derive(Default)]
struct Slots {
    by_key: FxHashMap<SnapshotKey, Slot>,
    /// Insertion order, oldest first
    order: VecDeque<SnapshotKey>,
}

/// Bounded snapshot cache
///
/// Each key owns a single `OnceCell`, so concurrent callers asking for the
/// same key wait on one computation. A failed computation leaves the cell
/// empty and the next caller retries. The oldest key is evicted once the
/// capacity is exceeded.
pub struct SnapshotCache {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl SnapshotCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Mutex::new(Slots::default()),
        }
    }

    fn slot(&self, key: &SnapshotKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.by_key.get(key) {
            return slot.clone();
        }

        let slot = Slot::default();
        slots.by_key.insert(key.clone(), slot.clone());
        slots.order.push_back(key.clone());
        while slots.order.len() > self.capacity {
            if let Some(oldest) = slots.order.pop_front() {
                slots.by_key.remove(&oldest);
            }
        }
        slot
    }

    /// Cached snapshot for `key`, computing it with `compute` on a miss
    pub async fn fetch<F, Fut>(&self, key: &SnapshotKey, compute: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let slot = self.slot(key);
        let snapshot = slot
            .get_or_try_init(|| async { compute().await.map(Arc::new) })
            .await?;
        Ok(snapshot.clone())
    }

    pub fn contains(&self, key: &SnapshotKey) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.by_key.get(key).is_some_and(|slot| slot.initialized())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
