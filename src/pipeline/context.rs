use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

use crate::adapters::ErrorReporter;
use crate::config::PipelineConfig;
use crate::repository::{Datastore, RepoRegistry};
use crate::snapshot::SnapshotFactory;

/// Everything a stage needs besides the record it works on
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub datastore: Arc<dyn Datastore>,
    pub repos: Arc<RepoRegistry>,
    pub snapshots: Arc<SnapshotFactory>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub checksums: ChecksumCache,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        datastore: Arc<dyn Datastore>,
        repos: Arc<RepoRegistry>,
        snapshots: Arc<SnapshotFactory>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            config,
            datastore,
            repos,
            snapshots,
            reporter,
            checksums: ChecksumCache::default(),
        }
    }
}

/// Last TMS checksum imported per (repo, commit, locale)
#[derive(Default)]
pub struct ChecksumCache {
    seen: Mutex<FxHashMap<(String, String, String), String>>,
}

impl ChecksumCache {
    /// Record `checksum`; true when it differs from the previous one
    pub fn changed(&self, repo_name: &str, commit_id: &str, locale: &str, checksum: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let key = (repo_name.to_string(), commit_id.to_string(), locale.to_string());
        match seen.get(&key) {
            Some(previous) if previous == checksum => false,
            _ => {
                seen.insert(key, checksum.to_string());
                true
            }
        }
    }

    /// Forget a checksum so the next pull imports the locale again
    pub fn forget(&self, repo_name: &str, commit_id: &str, locale: &str) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.remove(&(repo_name.to_string(), commit_id.to_string(), locale.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_cache() {
        let cache = ChecksumCache::default();
        assert!(cache.changed("app", "c1", "de-DE", "aa"));
        assert!(!cache.changed("app", "c1", "de-DE", "aa"));
        assert!(cache.changed("app", "c1", "fr-FR", "aa"));
        assert!(cache.changed("app", "c1", "de-DE", "bb"));

        cache.forget("app", "c1", "de-DE");
        assert!(cache.changed("app", "c1", "de-DE", "bb"));
    }
}
