//! Collaborators the pipeline talks to through traits
//!
//! Concrete adapters are looked up by the `type` string used in
//! configuration. The registry is filled once at startup; asking for an
//! identifier nobody registered is a configuration error.

mod extractor;
mod reporter;
mod tms;

pub use extractor::{ExtractError, Extractor, PatternExtractor};
pub use reporter::{CollectingReporter, ErrorContext, ErrorReporter, Severity, TracingReporter};
pub use tms::{MemoryTms, Tms, TmsError, TranslationStatus};

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::config::{ConfigError, ExtractorConfig, RepoConfig};

pub type ExtractorFactory = fn(&ExtractorConfig) -> Result<Arc<dyn Extractor>, ConfigError>;
pub type TmsFactory = fn(&RepoConfig) -> Result<Arc<dyn Tms>, ConfigError>;

#[derive(Default)]
pub struct AdapterRegistry {
    extractors: FxHashMap<&'static str, ExtractorFactory>,
    tms: FxHashMap<&'static str, TmsFactory>,
}

impl AdapterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the adapters shipped with this crate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_extractor("pattern", |config| {
            Ok(Arc::new(PatternExtractor::from_config(config)?))
        });
        registry.register_tms("memory", |config| Ok(Arc::new(MemoryTms::from_config(config)?)));
        registry
    }

    pub fn register_extractor(&mut self, name: &'static str, factory: ExtractorFactory) {
        self.extractors.insert(name, factory);
    }

    pub fn register_tms(&mut self, name: &'static str, factory: TmsFactory) {
        self.tms.insert(name, factory);
    }

    pub fn build_extractor(&self, config: &ExtractorConfig) -> Result<Arc<dyn Extractor>, ConfigError> {
        let factory = self.extractors.get(config.kind.as_str()).ok_or_else(|| ConfigError::UnknownType {
            kind: "extractor",
            name: config.kind.clone(),
        })?;
        factory(config)
    }

    pub fn build_tms(&self, config: &RepoConfig) -> Result<Arc<dyn Tms>, ConfigError> {
        let factory = self.tms.get(config.tms.kind.as_str()).ok_or_else(|| ConfigError::UnknownType {
            kind: "tms",
            name: config.tms.kind.clone(),
        })?;
        factory(config)
    }
}
