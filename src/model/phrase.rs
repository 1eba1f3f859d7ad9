use serde::{Deserialize, Serialize};

/// Which field a phrase is tracked by.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKey {
    Key,
    MetaKey,
}

/// A unit of translatable text found in a source file at some commit.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Phrase {
    pub key: String,
    pub meta_key: Option<String>,
    pub file: String,
    pub commit_id: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub line_number: Option<u32>,
}

impl Phrase {
    pub fn new(key: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_meta_key(mut self, meta_key: impl Into<String>) -> Self {
        self.meta_key = Some(meta_key.into());
        self
    }

    pub fn at_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = commit_id.into();
        self
    }

    /// The meta key, if present and non-empty
    pub fn stable_meta_key(&self) -> Option<&str> {
        self.meta_key.as_deref().filter(|m| !m.is_empty())
    }

    /// `MetaKey` when a non-empty meta key is present, `Key` otherwise
    pub fn index_key(&self) -> IndexKey {
        match self.stable_meta_key() {
            Some(_) => IndexKey::MetaKey,
            None => IndexKey::Key,
        }
    }

    /// Value of the field selected by [`Phrase::index_key`]. Never absent.
    pub fn index_value(&self) -> &str {
        match self.index_key() {
            IndexKey::MetaKey => self.stable_meta_key().unwrap_or_default(),
            IndexKey::Key => &self.key,
        }
    }
}

/// A phrase as produced by an extractor, before file/commit context is attached
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PhraseFragment {
    pub key: String,
    pub meta_key: Option<String>,
}

impl PhraseFragment {
    pub fn into_phrase(self, file: &str, commit_id: &str, line_number: u32) -> Phrase {
        Phrase {
            key: self.key,
            meta_key: self.meta_key,
            file: file.to_string(),
            commit_id: commit_id.to_string(),
            author_name: None,
            author_email: None,
            line_number: Some(line_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key_identity() {
        let phrase = Phrase::new("Hello", "a.txt");
        assert_eq!(phrase.index_key(), IndexKey::Key);
        assert_eq!(phrase.index_value(), "Hello");
    }

    #[test]
    fn test_meta_key_identity() {
        let phrase = Phrase::new("Hello", "a.txt").with_meta_key("greet");
        assert_eq!(phrase.index_key(), IndexKey::MetaKey);
        assert_eq!(phrase.index_value(), "greet");
    }

    #[test]
    fn test_empty_meta_key_falls_back_to_key() {
        let phrase = Phrase::new("Hello", "a.txt").with_meta_key("");
        assert_eq!(phrase.index_key(), IndexKey::Key);
        assert_eq!(phrase.index_value(), "Hello");
    }

    #[test]
    fn test_index_value_never_absent() {
        let phrase = Phrase::default();
        assert_eq!(phrase.index_key(), IndexKey::Key);
        assert_eq!(phrase.index_value(), "");
    }
}
