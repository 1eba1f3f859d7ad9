//! Path predicates used to select which files a snapshot tracks
//!
//! Filters are written in configuration as a tagged tree and compiled
//! once into a [`FileFilter`]; compilation is where bad patterns fail.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::util::{file_extension, normalize_extension};

/// Filter as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    Extension { extensions: Vec<String> },
    PathPrefix { prefix: String },
    Regex { pattern: String },
    And { filters: Vec<FilterConfig> },
    Or { filters: Vec<FilterConfig> },
    Not { filter: Box<FilterConfig> },
}

/// Compiled path predicate
#[derive(Debug, Clone)]
pub enum FileFilter {
    /// Matches everything
    All,
    Extension(Vec<String>),
    PathPrefix(String),
    /// Exactly this path
    Path(String),
    Regex(Regex),
    And(Vec<FileFilter>),
    Or(Vec<FileFilter>),
    Not(Box<FileFilter>),
}

impl FileFilter {
    pub fn compile(config: &FilterConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            FilterConfig::Extension { extensions } => {
                if extensions.is_empty() {
                    return Err(ConfigError::Invalid("extension filter lists no extensions".into()));
                }
                FileFilter::Extension(extensions.iter().map(|e| normalize_extension(e)).collect())
            }
            FilterConfig::PathPrefix { prefix } => {
                FileFilter::PathPrefix(prefix.trim_start_matches("./").to_string())
            }
            FilterConfig::Regex { pattern } => FileFilter::Regex(
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?,
            ),
            FilterConfig::And { filters } => FileFilter::And(Self::compile_all(filters)?),
            FilterConfig::Or { filters } => FileFilter::Or(Self::compile_all(filters)?),
            FilterConfig::Not { filter } => FileFilter::Not(Box::new(Self::compile(filter)?)),
        })
    }

    fn compile_all(configs: &[FilterConfig]) -> Result<Vec<FileFilter>, ConfigError> {
        configs.iter().map(Self::compile).collect()
    }

    /// Evaluate against a repo-relative path, short-circuiting
    pub fn matches(&self, path: &str) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Extension(exts) => {
                file_extension(path).is_some_and(|ext| exts.iter().any(|e| *e == ext))
            }
            FileFilter::PathPrefix(prefix) => path.starts_with(prefix.as_str()),
            FileFilter::Path(exact) => path == exact.as_str(),
            FileFilter::Regex(re) => re.is_match(path),
            FileFilter::And(filters) => filters.iter().all(|f| f.matches(path)),
            FileFilter::Or(filters) => filters.iter().any(|f| f.matches(path)),
            FileFilter::Not(filter) => !filter.matches(path),
        }
    }

    /// Union of several filters; a single filter is returned as is
    pub fn any_of(mut filters: Vec<FileFilter>) -> FileFilter {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            FileFilter::Or(filters)
        }
    }

    /// Restrict this filter to an explicit path list (empty list = no restriction)
    pub fn restricted_to(&self, paths: &[String]) -> FileFilter {
        if paths.is_empty() {
            return self.clone();
        }
        let exact = paths.iter().map(|p| FileFilter::Path(p.clone())).collect();
        FileFilter::And(vec![self.clone(), FileFilter::Or(exact)])
    }
}
