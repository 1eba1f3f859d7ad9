//! Translation management system seam and the in-process adapter

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::Hasher;
use std::sync::Mutex;

use crate::config::{ConfigError, RepoConfig};
use crate::model::Phrase;

#[derive(Debug, thiserror::Error)]
pub enum TmsError {
    /// The TMS has never seen this phrase
    #[error("phrase not found in TMS: {0}")]
    PhraseNotFound(String),

    #[error("TMS backend error: {0}")]
    Backend(String),
}

/// Per-locale translation progress for one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationStatus {
    pub phrase_count: u64,
    locale_counts: FxHashMap<String, u64>,
}

impl TranslationStatus {
    pub fn new(phrase_count: u64, locale_counts: FxHashMap<String, u64>) -> Self {
        Self { phrase_count, locale_counts }
    }

    /// Translated phrases for `locale`
    pub fn locale_count(&self, locale: &str) -> u64 {
        self.locale_counts.get(locale).copied().unwrap_or(0)
    }

    /// Every reported locale covers every phrase
    pub fn fully_translated(&self, locales: &[String]) -> bool {
        locales
            .iter()
            .all(|locale| self.locale_count(locale) >= self.phrase_count)
    }
}

#[async_trait]
pub trait Tms: Send + Sync {
    /// Upload phrases that need translating for `commit_id`
    async fn store_phrases(&self, phrases: &[Phrase], commit_id: &str) -> Result<(), TmsError>;

    async fn lookup_translation(&self, locale: &str, phrase: &Phrase) -> Result<Option<String>, TmsError>;

    async fn status(&self, commit_id: &str) -> Result<TranslationStatus, TmsError>;

    /// Fingerprint of a locale's translations for a commit; changes whenever they do
    async fn checksum_for(&self, locale: &str, commit_id: &str) -> Result<String, TmsError>;

    /// Cleanup hook once a commit is fully translated
    async fn finalize(&self, commit_id: &str) -> Result<(), TmsError>;
}

#[derive(Default)]
struct MemoryState {
    phrases_by_commit: FxHashMap<String, Vec<Phrase>>,
    known: FxHashSet<String>,
    /// (locale, index value) -> translation
    translations: FxHashMap<(String, String), String>,
    finalized: FxHashSet<String>,
}

/// TMS kept entirely in process memory
///
/// Translations are keyed by locale and phrase index value and can be
/// seeded from the `translations` table of the repository's `tms` config.
#[derive(Default)]
pub struct MemoryTms {
    state: Mutex<MemoryState>,
}

impl MemoryTms {
    pub fn new() -> Self {
        Self::default()
    }

    /// `tms = { type = "memory", translations = { "de-DE" = { "Hello" = "Hallo" } } }`
    pub fn from_config(config: &RepoConfig) -> Result<Self, ConfigError> {
        let tms = Self::new();
        let Some(seed) = config.tms.options.get("translations") else {
            return Ok(tms);
        };
        let locales = seed
            .as_table()
            .ok_or_else(|| ConfigError::Invalid("tms.translations must be a table".into()))?;
        for (locale, entries) in locales {
            let entries = entries.as_table().ok_or_else(|| {
                ConfigError::Invalid(format!("tms.translations.{} must be a table", locale))
            })?;
            for (phrase, text) in entries {
                let text = text.as_str().ok_or_else(|| {
                    ConfigError::Invalid(format!("translation for {} must be a string", phrase))
                })?;
                tms.add_translation(locale, phrase, text);
            }
        }
        Ok(tms)
    }

    pub fn add_translation(&self, locale: &str, index_value: &str, text: &str) {
        let mut state = self.lock();
        state
            .translations
            .insert((locale.to_string(), index_value.to_string()), text.to_string());
    }

    pub fn is_finalized(&self, commit_id: &str) -> bool {
        self.lock().finalized.contains(commit_id)
    }

    pub fn stored_phrases(&self, commit_id: &str) -> Vec<Phrase> {
        self.lock()
            .phrases_by_commit
            .get(commit_id)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another caller panicked mid-update of plain maps
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Tms for MemoryTms {
    async fn store_phrases(&self, phrases: &[Phrase], commit_id: &str) -> Result<(), TmsError> {
        let mut state = self.lock();
        for phrase in phrases {
            state.known.insert(phrase.index_value().to_string());
        }
        let stored = state.phrases_by_commit.entry(commit_id.to_string()).or_default();
        for phrase in phrases {
            if !stored.contains(phrase) {
                stored.push(phrase.clone());
            }
        }
        Ok(())
    }

    async fn lookup_translation(&self, locale: &str, phrase: &Phrase) -> Result<Option<String>, TmsError> {
        let state = self.lock();
        let id = phrase.index_value();
        if !state.known.contains(id) {
            return Err(TmsError::PhraseNotFound(id.to_string()));
        }
        Ok(state.translations.get(&(locale.to_string(), id.to_string())).cloned())
    }

    async fn status(&self, commit_id: &str) -> Result<TranslationStatus, TmsError> {
        let state = self.lock();
        let phrases = state.phrases_by_commit.get(commit_id).map(Vec::as_slice).unwrap_or_default();

        let mut counts: FxHashMap<String, u64> = FxHashMap::default();
        // One count per stored phrase, matching phrase_count
        for (locale, id) in state.translations.keys() {
            let covered = phrases.iter().filter(|p| p.index_value() == id).count() as u64;
            if covered > 0 {
                *counts.entry(locale.clone()).or_default() += covered;
            }
        }
        Ok(TranslationStatus::new(phrases.len() as u64, counts))
    }

    async fn checksum_for(&self, locale: &str, commit_id: &str) -> Result<String, TmsError> {
        let state = self.lock();
        let mut ids: Vec<&str> = state
            .phrases_by_commit
            .get(commit_id)
            .map(|phrases| phrases.iter().map(Phrase::index_value).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();

        let mut hasher = FxHasher::default();
        for id in ids {
            hasher.write(id.as_bytes());
            hasher.write_u8(0);
            if let Some(text) = state.translations.get(&(locale.to_string(), id.to_string())) {
                hasher.write(text.as_bytes());
            }
            hasher.write_u8(0xff);
        }
        Ok(hex::encode(hasher.finish().to_be_bytes()))
    }

    async fn finalize(&self, commit_id: &str) -> Result<(), TmsError> {
        self.lock().finalized.insert(commit_id.to_string());
        Ok(())
    }
}
