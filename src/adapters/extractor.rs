use regex::Regex;

use crate::config::{ConfigError, ExtractorConfig};
use crate::model::PhraseFragment;
use crate::snapshot::FileFilter;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("syntax error: {0}")]
    Syntax(String),
}

/// Pulls phrases out of the contents of one source file
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    /// Files this extractor applies to
    fn filter(&self) -> &FileFilter;

    fn matches(&self, path: &str) -> bool {
        self.filter().matches(path)
    }

    /// Every phrase in `source` with its 1-based line number
    fn extract_each_phrase(&self, source: &[u8]) -> Result<Vec<(PhraseFragment, u32)>, ExtractError>;
}

/// Regex-driven extractor: the pattern's `key` group is the phrase text,
/// an optional `meta_key` group supplies the stable identifier.
pub struct PatternExtractor {
    pattern: Regex,
    filter: FileFilter,
}

impl PatternExtractor {
    pub fn new(pattern: &str, filter: FileFilter) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        if !pattern.capture_names().flatten().any(|name| name == "key") {
            return Err(ConfigError::Invalid(format!(
                "extractor pattern {:?} has no `key` group",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern, filter })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        let pattern = config
            .options
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConfigError::Invalid("pattern extractor needs a `pattern` string".into()))?;
        Self::new(pattern, FileFilter::compile(&config.filter)?)
    }
}

impl Extractor for PatternExtractor {
    fn name(&self) -> &str {
        "pattern"
    }

    fn filter(&self) -> &FileFilter {
        &self.filter
    }

    fn extract_each_phrase(&self, source: &[u8]) -> Result<Vec<(PhraseFragment, u32)>, ExtractError> {
        let text = std::str::from_utf8(source)
            .map_err(|e| ExtractError::Syntax(format!("not valid UTF-8: {}", e)))?;

        let mut phrases = Vec::new();
        let mut line = 1u32;
        let mut scanned = 0usize;
        for caps in self.pattern.captures_iter(text) {
            let Some(key) = caps.name("key") else { continue };
            line += text[scanned..key.start()].matches('\n').count() as u32;
            scanned = key.start();

            let fragment = PhraseFragment {
                key: key.as_str().to_string(),
                meta_key: caps.name("meta_key").map(|m| m.as_str().to_string()),
            };
            phrases.push((fragment, line));
        }
        Ok(phrases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(pattern: &str) -> PatternExtractor {
        PatternExtractor::new(pattern, FileFilter::All).unwrap()
    }

    #[test]
    fn test_extracts_keys_with_lines() {
        let ex = extractor(r#"t\("(?P<key>[^"]+)"\)"#);
        let source = b"puts t(\"Hello\")\n\nputs t(\"Bye\") + t(\"Again\")\n";
        let phrases = ex.extract_each_phrase(source).unwrap();
        let found: Vec<_> = phrases.iter().map(|(f, l)| (f.key.as_str(), *l)).collect();
        assert_eq!(found, vec![("Hello", 1), ("Bye", 3), ("Again", 3)]);
    }

    #[test]
    fn test_extracts_meta_keys() {
        let ex = extractor(r#"(?P<meta_key>\w+):\s*"(?P<key>[^"]*)""#);
        let phrases = ex.extract_each_phrase(b"greet: \"Hello\"\n").unwrap();
        assert_eq!(phrases[0].0.meta_key.as_deref(), Some("greet"));
        assert_eq!(phrases[0].0.key, "Hello");
    }

    #[test]
    fn test_invalid_utf8_is_syntax_error() {
        let ex = extractor(r#"(?P<key>x)"#);
        assert!(matches!(ex.extract_each_phrase(&[0xff, 0xfe]), Err(ExtractError::Syntax(_))));
    }

    #[test]
    fn test_pattern_without_key_group_rejected() {
        assert!(PatternExtractor::new(r#"t\("([^"]+)"\)"#, FileFilter::All).is_err());
    }
}
