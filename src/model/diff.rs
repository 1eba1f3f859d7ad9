use serde::{Deserialize, Serialize};

use super::Phrase;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffState {
    Added,
    Removed,
    Modified,
    Unmodified,
}

/// One classified phrase from a phrase diff
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub phrase: Phrase,
    pub state: DiffState,
    /// The identity-matched phrase this one replaced; set for `Modified` only
    pub old_phrase: Option<Phrase>,
}

impl DiffEntry {
    pub fn added(phrase: Phrase) -> Self {
        Self { phrase, state: DiffState::Added, old_phrase: None }
    }

    pub fn removed(phrase: Phrase) -> Self {
        Self { phrase, state: DiffState::Removed, old_phrase: None }
    }

    pub fn modified(phrase: Phrase, old_phrase: Phrase) -> Self {
        Self { phrase, state: DiffState::Modified, old_phrase: Some(old_phrase) }
    }
}

/// Result of comparing two phrase sets. Unmodified phrases are not kept.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PhraseDiff {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub modified: Vec<DiffEntry>,
}

impl PhraseDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// New and edited phrases: what a translation vendor needs to see
    pub fn changed_phrases(&self) -> Vec<Phrase> {
        self.added
            .iter()
            .chain(&self.modified)
            .map(|entry| entry.phrase.clone())
            .collect()
    }
}
