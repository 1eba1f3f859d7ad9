use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::adapters::{AdapterRegistry, Extractor, Tms};
use crate::config::{Config, ConfigError, RepoConfig};
use crate::snapshot::FileFilter;

/// A configured repository with its collaborators built
pub struct RepoHandle {
    pub name: String,
    pub path: PathBuf,
    pub locales: Vec<String>,
    pub extractors: Vec<Arc<dyn Extractor>>,
    pub tms: Arc<dyn Tms>,
    /// Union of the extractors' filters: the files snapshots track
    pub filter: FileFilter,
}

impl RepoHandle {
    pub fn build(config: &RepoConfig, registry: &AdapterRegistry) -> Result<Self, ConfigError> {
        let extractors = config
            .extractors
            .iter()
            .map(|e| registry.build_extractor(e))
            .collect::<Result<Vec<_>, _>>()?;
        let filter = FileFilter::any_of(extractors.iter().map(|e| e.filter().clone()).collect());
        Ok(Self {
            name: config.name.clone(),
            path: config.path.clone(),
            locales: config.locales.clone(),
            tms: registry.build_tms(config)?,
            extractors,
            filter,
        })
    }

    /// First extractor that applies to `path`
    pub fn extractor_for(&self, path: &str) -> Option<&Arc<dyn Extractor>> {
        self.extractors.iter().find(|e| e.matches(path))
    }
}

/// Every configured repository, by name
#[derive(Default)]
pub struct RepoRegistry {
    repos: FxHashMap<String, Arc<RepoHandle>>,
}

impl RepoRegistry {
    pub fn from_config(config: &Config, adapters: &AdapterRegistry) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for repo in &config.repos {
            registry.insert(RepoHandle::build(repo, adapters)?);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, handle: RepoHandle) {
        self.repos.insert(handle.name.clone(), Arc::new(handle));
    }

    pub fn get(&self, name: &str) -> Result<Arc<RepoHandle>, ConfigError> {
        self.repos
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRepo(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repos.keys().map(String::as_str)
    }
}
