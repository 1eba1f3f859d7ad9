//! Configuration file loading
//!
//! ```toml
//! [pipeline]
//! database = "/var/lib/phrasetrail/phrasetrail.db"
//! pull_workers = 5
//!
//! [[repos]]
//! name = "app"
//! path = "/srv/git/app"
//! locales = ["de-DE", "ja-JP"]
//! tms = { type = "memory" }
//!
//! [[repos.extractors]]
//! type = "pattern"
//! pattern = 't\("(?P<key>[^"]+)"\)'
//! filter = { type = "extension", extensions = ["rb"] }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::snapshot::FilterConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown {kind} type: {name}")]
    UnknownType { kind: &'static str, name: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown repository: {0}")]
    UnknownRepo(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// SQLite database path; defaults to the user cache directory
    pub database: Option<PathBuf>,
    /// Concurrent locale imports during a pull
    pub pull_workers: usize,
    pub pull_delay_secs: u64,
    pub finalize_delay_min_secs: u64,
    pub finalize_delay_max_secs: u64,
    /// Skip a locale's import when its TMS checksum has not changed
    pub detect_translation_changes: bool,
    pub default_queue: String,
    pub snapshot_cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database: None,
            pull_workers: 5,
            pull_delay_secs: 600,
            finalize_delay_min_secs: 300,
            finalize_delay_max_secs: 900,
            detect_translation_changes: false,
            default_queue: crate::model::DEFAULT_QUEUE.to_string(),
            snapshot_cache_capacity: 256,
        }
    }
}

impl PipelineConfig {
    pub fn pull_delay(&self) -> Duration {
        Duration::from_secs(self.pull_delay_secs)
    }

    pub fn finalize_delay_range(&self) -> std::ops::RangeInclusive<u64> {
        self.finalize_delay_min_secs..=self.finalize_delay_max_secs
    }

    /// Configured database path, or `<cache dir>/phrasetrail/phrasetrail.db`
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dir = dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("phrasetrail");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;
        Ok(dir.join("phrasetrail.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub locales: Vec<String>,
    pub tms: TmsConfig,
    #[serde(default)]
    pub extractors: Vec<ExtractorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmsConfig {
    #[serde(rename = "type")]
    pub kind: String,
    /// Adapter specific settings
    #[serde(flatten)]
    pub options: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub filter: FilterConfig,
    /// Extractor specific settings
    #[serde(flatten)]
    pub options: toml::Table,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config: {}", path.display()))?;
        let config = Self::parse(&raw).with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.pull_workers == 0 {
            return Err(ConfigError::Invalid("pull_workers must be at least 1".into()));
        }
        if pipeline.finalize_delay_min_secs > pipeline.finalize_delay_max_secs {
            return Err(ConfigError::Invalid(
                "finalize_delay_min_secs exceeds finalize_delay_max_secs".into(),
            ));
        }

        let mut names = rustc_hash::FxHashSet::default();
        for repo in &self.repos {
            if !names.insert(repo.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate repository name: {}", repo.name)));
            }
            if repo.extractors.is_empty() {
                return Err(ConfigError::Invalid(format!("repository {} has no extractors", repo.name)));
            }
        }
        Ok(())
    }

    pub fn repo(&self, name: &str) -> Result<&RepoConfig, ConfigError> {
        self.repos
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| ConfigError::UnknownRepo(name.to_string()))
    }
}
